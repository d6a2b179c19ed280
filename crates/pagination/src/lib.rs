//! Cursor-based (keyset) pagination shared by every listable resource.
//!
//! A listing request goes through four steps:
//!
//! 1. [`PageRequest::normalize`] turns client arguments into a canonical
//!    request: scan direction, sort field, page size, decoded cursors.
//! 2. [`build_range_query`] turns that into a store query, or decides that
//!    the scope is unreadable and nothing needs to run.
//! 3. The [`DocumentStore`] counts the base set and reads the window.
//! 4. [`assemble_page`] drops the sentinel row, sets the boundary flags and
//!    issues cursors.
//!
//! [`Paginator`] runs all four with a timeout and a cancellation token.

mod connection;
mod cursor;
pub mod knobs;
mod metrics;
mod page;
mod paginator;
mod predicate;
mod range;
mod request;
mod resource;
mod sort;
mod store;
mod value;
mod visibility;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use self::{
    connection::{
        Connection,
        Edge,
    },
    cursor::{
        Cursor,
        DecodedCursor,
        decode_cursor,
        encode_cursor,
        encode_identity_cursor,
    },
    page::{
        Batch,
        Page,
        PageInfo,
        assemble_page,
        collect_candidates,
        record_cursor,
    },
    paginator::Paginator,
    predicate::{
        KeywordMatch,
        Predicate,
    },
    range::{
        QueryPlan,
        RangeQuery,
        build_range_query,
    },
    request::{
        Anchor,
        AnchorKey,
        ListArgs,
        PageRequest,
        PaginationArgs,
        ScanDirection,
    },
    resource::{
        ASSET,
        DATASET_SCHEMA,
        PROJECT,
        ResourceSchema,
        ScopeKind,
    },
    sort::{
        ID_FIELD,
        Order,
        SortField,
        SortKey,
        SortSpec,
        ValueType,
    },
    store::{
        DocumentStore,
        Record,
        RecordStream,
    },
    value::Value,
    visibility::VisibilityFilter,
};
