//! Builds the store query for one page.
//!
//! A page is the set of records matching the base predicate (scope, hidden
//! record exclusions, keyword) and lying strictly inside the cursor window,
//! read in scan order up to the fetch limit. Boundaries compare the pair
//! `(sort key, identity)`:
//!
//! ```text
//! after (k, i):   key > k OR (key == k AND id > i)
//! before (k, i):  key MISSING OR key < k OR (key == k AND id < i)
//! ```
//!
//! Records without a sort value order before every value, so an anchor on
//! such a record compares identities among the missing ones only:
//!
//! ```text
//! after (-, i):   (key MISSING AND id > i) OR key EXISTS
//! before (-, i):  key MISSING AND id < i
//! ```
//!
//! `after` and `before` are positions in ascending order regardless of the
//! scan direction; the direction only changes which end of the window the
//! limit keeps.

use std::fmt;

use crate::{
    metrics::log_cursor_key_fallback,
    predicate::Predicate,
    request::{
        Anchor,
        AnchorKey,
        PageRequest,
    },
    resource::ResourceSchema,
    sort::{
        ID_FIELD,
        Order,
        SortField,
        SortKey,
        SortSpec,
    },
    store::Record,
    value::Value,
    visibility::VisibilityFilter,
};

/// An ordered, limited range query. Built fresh for every page and never
/// executed here.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeQuery {
    /// Scope, exclusions and keyword. This alone determines the total count.
    pub base: Predicate,
    /// The cursor window, if the request carried any cursor.
    pub boundary: Option<Predicate>,
    pub sort: SortSpec,
    pub limit: usize,
}

impl RangeQuery {
    /// The same query resumed strictly past `record` in scan order, reading
    /// at most `limit` rows.
    pub fn resume_past<R: Record>(&self, record: &R, limit: usize) -> RangeQuery {
        let field = self.sort.field;
        let side = match self.sort.order {
            Order::Asc => Side::After,
            Order::Desc => Side::Before,
        };
        let key = match record.sort_key(field) {
            _ if field == SortField::Id => AnchorKey::IdentityOnly,
            Some(key) => AnchorKey::Value(key.to_cursor_string()),
            None => AnchorKey::Missing,
        };
        let anchor = Anchor {
            identity: record.identity().to_owned(),
            key,
        };
        let past = boundary(field, &anchor, side);
        RangeQuery {
            base: self.base.clone(),
            boundary: Some(Predicate::all(self.boundary.iter().cloned().chain([past]))),
            sort: self.sort,
            limit,
        }
    }

    /// The predicate the range read must satisfy.
    pub fn filter(&self) -> Predicate {
        match &self.boundary {
            Some(boundary) => Predicate::all([self.base.clone(), boundary.clone()]),
            None => self.base.clone(),
        }
    }
}

impl fmt::Display for RangeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<_> = self
            .sort
            .keys()
            .into_iter()
            .map(|(field, order)| format!("{field} {order:?}"))
            .collect();
        write!(
            f,
            "WHERE {} ORDER BY {} LIMIT {}",
            self.filter(),
            keys.join(", "),
            self.limit
        )
    }
}

/// What to do for a page: either nothing (the scope is not readable) or
/// run a range query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryPlan {
    Unreadable,
    Range(RangeQuery),
}

pub fn build_range_query(
    schema: &ResourceSchema,
    visibility: &VisibilityFilter,
    scope_id: &str,
    request: &PageRequest,
) -> QueryPlan {
    if !visibility.can_read(scope_id) {
        return QueryPlan::Unreadable;
    }
    let base = schema.base_predicate(scope_id, request.keyword.as_ref());
    let field = request.sort.field;
    let bounds: Vec<_> = [
        request.after.as_ref().map(|a| boundary(field, a, Side::After)),
        request.before.as_ref().map(|a| boundary(field, a, Side::Before)),
    ]
    .into_iter()
    .flatten()
    .collect();
    let query = RangeQuery {
        base,
        boundary: (!bounds.is_empty()).then(|| Predicate::all(bounds)),
        sort: request.sort,
        limit: request.fetch_limit(),
    };
    tracing::debug!("{} range query: {query}", schema.name);
    QueryPlan::Range(query)
}

#[derive(Clone, Copy)]
enum Side {
    After,
    Before,
}

impl Side {
    fn strict(&self, field: &str, value: Value) -> Predicate {
        match self {
            Side::After => Predicate::gt(field, value),
            Side::Before => Predicate::lt(field, value),
        }
    }
}

fn boundary(field: SortField, anchor: &Anchor, side: Side) -> Predicate {
    let past_id = side.strict(ID_FIELD, Value::from(anchor.identity.as_str()));
    let name = field.field_name();
    match (&anchor.key, side) {
        (AnchorKey::IdentityOnly, _) => past_id,
        (AnchorKey::Value(_), _) if field == SortField::Id => past_id,
        (AnchorKey::Value(raw), Side::After) => {
            let key = key_value(field, raw);
            Predicate::any([
                side.strict(name, key.clone()),
                Predicate::all([Predicate::Eq(name.to_owned(), key), past_id]),
            ])
        },
        (AnchorKey::Value(raw), Side::Before) => {
            let key = key_value(field, raw);
            Predicate::any([
                Predicate::exists(name, false),
                side.strict(name, key.clone()),
                Predicate::all([Predicate::Eq(name.to_owned(), key), past_id]),
            ])
        },
        (AnchorKey::Missing, Side::After) => Predicate::any([
            Predicate::all([Predicate::exists(name, false), past_id]),
            Predicate::exists(name, true),
        ]),
        (AnchorKey::Missing, Side::Before) => {
            Predicate::all([Predicate::exists(name, false), past_id])
        },
    }
}

/// Parses a cursor key back into the field's native type. A key that does
/// not parse is compared as text, which only matches text-typed fields.
fn key_value(field: SortField, raw: &str) -> Value {
    match SortKey::parse(field, raw) {
        Ok(key) => key.into_value(),
        Err(e) => {
            tracing::warn!("Cursor key {raw:?} for {field} does not parse, comparing as text: {e:#}");
            log_cursor_key_fallback(field.into());
            Value::String(raw.to_owned())
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        QueryPlan,
        build_range_query,
    };
    use crate::{
        cursor::Cursor,
        request::{
            ListArgs,
            PageRequest,
            PaginationArgs,
        },
        resource::ASSET,
        testing::TestRecord,
        visibility::VisibilityFilter,
    };

    fn plan(args: ListArgs) -> String {
        let request = PageRequest::normalize(&ASSET, args).unwrap();
        match build_range_query(&ASSET, &VisibilityFilter::Unrestricted, "w1", &request) {
            QueryPlan::Range(query) => query.to_string(),
            QueryPlan::Unreadable => panic!("unreadable"),
        }
    }

    #[test]
    fn test_after_is_strict_composite() {
        let args = ListArgs::paginate(
            PaginationArgs::first(2).after(Some(Cursor::new("size/a5:100"))),
        )
        .with_sort("size");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND (size > 100 OR (size == 100 AND id > \"a5\"))) \
             ORDER BY size Asc, id Asc LIMIT 3"
        );
    }

    #[test]
    fn test_before_with_last_scans_descending() {
        let args = ListArgs::paginate(
            PaginationArgs::last(2).before(Some(Cursor::new("name/a5:tree"))),
        )
        .with_sort("name");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND (name MISSING OR name < \"tree\" OR \
             (name == \"tree\" AND id < \"a5\"))) ORDER BY name Desc, id Desc LIMIT 3"
        );
    }

    #[test]
    fn test_identity_only_cursor() {
        let args = ListArgs::paginate(PaginationArgs::first(1).after(Some(Cursor::new("id/a5"))))
            .with_sort("id");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND id > \"a5\") ORDER BY id Asc LIMIT 2"
        );
    }

    #[test]
    fn test_empty_key_keeps_composite_boundary() {
        let args = ListArgs::paginate(PaginationArgs::first(1).after(Some(Cursor::new("name/z9:"))))
            .with_sort("name");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND (name > \"\" OR (name == \"\" AND id > \"z9\"))) \
             ORDER BY name Asc, id Asc LIMIT 2"
        );
    }

    #[test]
    fn test_missing_key_sorts_first() {
        let args = ListArgs::paginate(PaginationArgs::first(1).after(Some(Cursor::new("name/z9"))))
            .with_sort("name");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND ((name MISSING AND id > \"z9\") OR name EXISTS)) \
             ORDER BY name Asc, id Asc LIMIT 2"
        );
        let args = ListArgs::paginate(PaginationArgs::last(1).before(Some(Cursor::new("name/z9"))))
            .with_sort("name");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND name MISSING AND id < \"z9\") \
             ORDER BY name Desc, id Desc LIMIT 2"
        );
    }

    #[test]
    fn test_window_applies_both_bounds() {
        let args = ListArgs::paginate(
            PaginationArgs::first(10)
                .after(Some(Cursor::new("id/a1")))
                .before(Some(Cursor::new("id/a9"))),
        )
        .with_sort("id");
        assert_eq!(
            plan(args),
            "WHERE (team == \"w1\" AND id > \"a1\" AND id < \"a9\") ORDER BY id Asc LIMIT 11"
        );
    }

    #[test]
    fn test_numeric_key_is_not_compared_as_text() {
        let request = PageRequest::normalize(
            &ASSET,
            ListArgs::paginate(PaginationArgs::first(1).after(Some(Cursor::new("a1:9"))))
                .with_sort("size"),
        )
        .unwrap();
        let QueryPlan::Range(query) =
            build_range_query(&ASSET, &VisibilityFilter::Unrestricted, "w1", &request)
        else {
            panic!("unreadable");
        };
        assert!(query.filter().to_string().contains("size > 9"));
        assert!(!query.filter().to_string().contains("size > \"9\""));
        assert_eq!(query.base.to_string(), "team == \"w1\"");
    }

    #[test]
    fn test_corrupt_numeric_key_falls_back_to_text() {
        let args = ListArgs::paginate(PaginationArgs::first(1).after(Some(Cursor::new("a1:big"))))
            .with_sort("size");
        assert!(plan(args).contains("size > \"big\""));
    }

    #[test]
    fn test_resume_past_keeps_cursor_window() {
        let args = ListArgs::paginate(
            PaginationArgs::last(2).before(Some(Cursor::new("size/a9:50"))),
        )
        .with_sort("size");
        let request = PageRequest::normalize(&ASSET, args).unwrap();
        let QueryPlan::Range(query) =
            build_range_query(&ASSET, &VisibilityFilter::Unrestricted, "w1", &request)
        else {
            panic!("unreadable");
        };
        let resumed = query.resume_past(&TestRecord::new("a7").with("size", 40), 1);
        assert_eq!(
            resumed.to_string(),
            "WHERE (team == \"w1\" AND (size MISSING OR size < 50 OR (size == 50 AND id < \"a9\")) \
             AND (size MISSING OR size < 40 OR (size == 40 AND id < \"a7\"))) \
             ORDER BY size Desc, id Desc LIMIT 1"
        );
    }

    #[test]
    fn test_unreadable_scope() {
        let request = PageRequest::normalize(&ASSET, ListArgs::default()).unwrap();
        assert_eq!(
            build_range_query(&ASSET, &VisibilityFilter::readable(["w2"]), "w1", &request),
            QueryPlan::Unreadable
        );
    }
}
