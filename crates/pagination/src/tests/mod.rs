//! End-to-end listing scenarios against the in-memory store.
mod chaining;

use tokio_util::sync::CancellationToken;

use crate::{
    ListArgs,
    Page,
    Paginator,
    PaginationArgs,
    Record,
    ResourceSchema,
    VisibilityFilter,
    testing::{
        TestRecord,
        TestStore,
    },
};

fn paginator(schema: ResourceSchema, records: Vec<TestRecord>) -> (Paginator<TestStore>, TestStore) {
    let store = TestStore::with_records(records);
    (Paginator::new(store.clone(), schema), store)
}

async fn list(
    paginator: &Paginator<TestStore>,
    scope_id: &str,
    args: ListArgs,
) -> anyhow::Result<Page<TestRecord>> {
    paginator
        .paginate(
            &VisibilityFilter::readable([scope_id]),
            scope_id,
            args,
            &CancellationToken::new(),
        )
        .await
}

async fn first(
    paginator: &Paginator<TestStore>,
    n: i64,
    after: Option<&Page<TestRecord>>,
) -> anyhow::Result<Page<TestRecord>> {
    let after = after.and_then(|p| p.page_info.end_cursor.clone());
    list(paginator, "w1", ListArgs::paginate(PaginationArgs::first(n).after(after))).await
}

fn ids(page: &Page<TestRecord>) -> Vec<&str> {
    page.items.iter().map(|r| r.identity()).collect()
}

fn asset_ids(range: impl IntoIterator<Item = usize>) -> Vec<String> {
    range.into_iter().map(|i| format!("asset-{i:03}")).collect()
}
