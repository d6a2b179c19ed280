use serde::Serialize;

use crate::{
    cursor::Cursor,
    page::{
        Page,
        PageInfo,
        record_cursor,
    },
    store::Record,
};

/// The GraphQL connection shape of a page.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    pub edges: Vec<Edge<N>>,
    pub nodes: Vec<N>,
    pub page_info: PageInfo,
    pub total_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Edge<N> {
    pub cursor: Cursor,
    pub node: N,
}

impl<R: Record> Page<R> {
    /// Maps each record to its API node. Every edge carries a cursor, so a
    /// client may resume from any item, not only the page ends.
    pub fn into_connection<N: Clone>(self, mut to_node: impl FnMut(R) -> N) -> Connection<N> {
        let field = self.sort_field;
        let edges: Vec<_> = self
            .items
            .into_iter()
            .map(|record| Edge {
                cursor: record_cursor(&record, field),
                node: to_node(record),
            })
            .collect();
        Connection {
            nodes: edges.iter().map(|e| e.node.clone()).collect(),
            edges,
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }
}
