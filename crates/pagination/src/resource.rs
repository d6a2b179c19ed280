//! Per-resource listing configuration.

use crate::{
    predicate::{
        KeywordMatch,
        Predicate,
    },
    sort::SortField,
};

/// What kind of id a listing is scoped by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeKind {
    Workspace,
    Scene,
}

/// Describes how one resource kind is listed: which fields hold its scope,
/// what it may be sorted by, and which field a keyword searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSchema {
    pub name: &'static str,
    pub scope_kind: ScopeKind,
    /// A record is in scope if any of these fields equals the scope id.
    pub scope_fields: &'static [&'static str],
    pub sortable_fields: &'static [SortField],
    pub default_sort: SortField,
    pub keyword_field: Option<&'static str>,
    /// Boolean fields; records where one of them is `true` are never listed.
    pub hidden_when_set: &'static [&'static str],
}

pub const ASSET: ResourceSchema = ResourceSchema {
    name: "asset",
    scope_kind: ScopeKind::Workspace,
    scope_fields: &["team"],
    sortable_fields: &[
        SortField::Id,
        SortField::Name,
        SortField::Size,
        SortField::CreatedAt,
    ],
    default_sort: SortField::CreatedAt,
    keyword_field: Some("name"),
    hidden_when_set: &[],
};

pub const PROJECT: ResourceSchema = ResourceSchema {
    name: "project",
    scope_kind: ScopeKind::Workspace,
    scope_fields: &["workspace", "team"],
    sortable_fields: &[SortField::UpdatedAt],
    default_sort: SortField::UpdatedAt,
    keyword_field: None,
    hidden_when_set: &["coresupport"],
};

pub const DATASET_SCHEMA: ResourceSchema = ResourceSchema {
    name: "dataset_schema",
    scope_kind: ScopeKind::Scene,
    scope_fields: &["scene"],
    sortable_fields: &[SortField::Scene],
    default_sort: SortField::Scene,
    keyword_field: None,
    hidden_when_set: &[],
};

impl ResourceSchema {
    pub fn supports_sort(&self, field: SortField) -> bool {
        self.sortable_fields.contains(&field)
    }

    pub fn scope_predicate(&self, scope_id: &str) -> Predicate {
        Predicate::any(
            self.scope_fields
                .iter()
                .map(|field| Predicate::eq(field, scope_id)),
        )
    }

    /// Scope, hidden-record exclusions and keyword, without any cursor
    /// boundary. Both the total count and the range query start from this.
    pub fn base_predicate(&self, scope_id: &str, keyword: Option<&KeywordMatch>) -> Predicate {
        let mut terms = vec![self.scope_predicate(scope_id)];
        terms.extend(
            self.hidden_when_set
                .iter()
                .map(|field| Predicate::ne(field, true)),
        );
        if let (Some(field), Some(keyword)) = (self.keyword_field, keyword) {
            terms.push(Predicate::ContainsIgnoreCase(field.to_owned(), keyword.clone()));
        }
        Predicate::all(terms)
    }
}
