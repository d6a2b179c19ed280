use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    predicate::Predicate,
    range::RangeQuery,
    sort::{
        SortField,
        SortKey,
    },
    value::Value,
};

/// A stored document that can be listed.
pub trait Record: Clone + Send + Sync + 'static {
    /// Unique, totally ordered id. Used as the sort tiebreaker.
    fn identity(&self) -> &str;

    /// The value of a top-level field, if present. `field("id")` must
    /// return the identity, since boundaries compare it.
    fn field(&self, name: &str) -> Option<Value>;

    fn sort_key(&self, field: SortField) -> Option<SortKey> {
        if field == SortField::Id {
            return Some(SortKey::Identity(self.identity().to_owned()));
        }
        SortKey::from_value(field, self.field(field.field_name())?)
    }
}

pub type RecordStream<R> = BoxStream<'static, anyhow::Result<R>>;

/// The backing document store of one resource kind.
///
/// Implementations must evaluate `RangeQuery::filter` exactly, return rows in
/// `RangeQuery::sort` order and stop after `RangeQuery::limit` rows. Errors
/// are passed back to the caller unchanged.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    type Record: Record;

    async fn count(&self, filter: &Predicate) -> anyhow::Result<u64>;

    async fn find(&self, query: &RangeQuery) -> anyhow::Result<RecordStream<Self::Record>>;
}
