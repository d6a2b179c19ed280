use std::collections::BTreeSet;

use crate::{
    resource::ResourceSchema,
    store::Record,
    value::Value,
};

/// The set of scope ids the caller may read. `Unrestricted` is used by
/// internal callers that bypass access control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisibilityFilter {
    Unrestricted,
    Readable(BTreeSet<String>),
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        VisibilityFilter::Readable(BTreeSet::new())
    }
}

impl VisibilityFilter {
    pub fn readable<S: Into<String>>(scopes: impl IntoIterator<Item = S>) -> Self {
        VisibilityFilter::Readable(scopes.into_iter().map(Into::into).collect())
    }

    pub fn can_read(&self, scope_id: &str) -> bool {
        match self {
            VisibilityFilter::Unrestricted => true,
            VisibilityFilter::Readable(scopes) => scopes.contains(scope_id),
        }
    }

    /// Row-level check applied to every candidate the store returns. A row
    /// is kept if any of its scope fields names a readable scope.
    pub fn row_filter<R: Record>(
        &self,
        schema: &ResourceSchema,
    ) -> impl Fn(&R) -> bool + Send + Sync + '_ {
        let scope_fields = schema.scope_fields;
        move |record: &R| match self {
            VisibilityFilter::Unrestricted => true,
            VisibilityFilter::Readable(scopes) => scope_fields.iter().any(|field| {
                matches!(record.field(field), Some(Value::String(s)) if scopes.contains(&s))
            }),
        }
    }
}
