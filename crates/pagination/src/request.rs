//! Turns a client's listing arguments into a canonical [`PageRequest`].

use errors::ErrorMetadata;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    cursor::{
        Cursor,
        decode_cursor,
    },
    knobs::{
        PAGINATION_DEFAULT_PAGE_SIZE,
        PAGINATION_MAX_PAGE_SIZE,
    },
    predicate::KeywordMatch,
    resource::ResourceSchema,
    sort::{
        Order,
        SortField,
        SortSpec,
    },
};

/// Relay-style pagination arguments as received from the API layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationArgs {
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub after: Option<Cursor>,
    pub before: Option<Cursor>,
}

impl PaginationArgs {
    pub fn first(n: i64) -> Self {
        Self {
            first: Some(n),
            ..Self::default()
        }
    }

    pub fn last(n: i64) -> Self {
        Self {
            last: Some(n),
            ..Self::default()
        }
    }

    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.after = cursor;
        self
    }

    pub fn before(mut self, cursor: Option<Cursor>) -> Self {
        self.before = cursor;
        self
    }
}

/// Everything a client may say about a listing besides its scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArgs {
    pub keyword: Option<String>,
    pub sort: Option<String>,
    pub pagination: Option<PaginationArgs>,
}

impl ListArgs {
    pub fn paginate(pagination: PaginationArgs) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanDirection {
    Forward,
    Backward,
}

impl ScanDirection {
    pub fn order(&self) -> Order {
        match self {
            ScanDirection::Forward => Order::Asc,
            ScanDirection::Backward => Order::Desc,
        }
    }
}

/// A decoded cursor, checked against the active sort field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub identity: String,
    pub key: AnchorKey,
}

/// Where an anchor sits on the sort field. A `Value` is still text; the
/// range query builder parses it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnchorKey {
    Value(String),
    /// The anchored record had no value for the sort field, so it sits among
    /// the records that sort first.
    Missing,
    /// Only the identity orders the anchor, as for the `id` sort or a
    /// legacy cursor without a key.
    IdentityOnly,
}

/// A listing request in canonical form.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pub sort: SortSpec,
    pub direction: ScanDirection,
    pub page_size: usize,
    pub after: Option<Anchor>,
    pub before: Option<Anchor>,
    pub keyword: Option<KeywordMatch>,
}

impl PageRequest {
    pub fn normalize(schema: &ResourceSchema, args: ListArgs) -> anyhow::Result<Self> {
        let pagination = args.pagination.unwrap_or_default();

        let (direction, requested) = match (pagination.first, pagination.last) {
            (Some(first), _) => (ScanDirection::Forward, Some(first)),
            (None, Some(last)) => (ScanDirection::Backward, Some(last)),
            (None, None) => (ScanDirection::Forward, None),
        };
        let page_size = match requested {
            None => *PAGINATION_DEFAULT_PAGE_SIZE,
            Some(n) => check_page_size(n)?,
        };

        let field = match args.sort {
            Some(name) => {
                let field = SortField::parse(&name)?;
                if !schema.supports_sort(field) {
                    anyhow::bail!(ErrorMetadata::bad_request(
                        "UnsupportedSortField",
                        format!("A {} listing cannot be sorted by {field}", schema.name),
                    ));
                }
                field
            },
            None => schema.default_sort,
        };

        let keyword = match args.keyword.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(keyword) => {
                if schema.keyword_field.is_none() {
                    anyhow::bail!(ErrorMetadata::bad_request(
                        "KeywordNotSupported",
                        format!("A {} listing cannot be filtered by keyword", schema.name),
                    ));
                }
                Some(KeywordMatch::new(keyword)?)
            },
        };

        Ok(Self {
            sort: SortSpec::new(field, direction.order()),
            direction,
            page_size,
            after: pagination.after.map(|c| anchor(&c, field)).transpose()?,
            before: pagination.before.map(|c| anchor(&c, field)).transpose()?,
            keyword,
        })
    }

    /// Rows to request from the store: the page plus one sentinel row.
    pub fn fetch_limit(&self) -> usize {
        self.page_size + 1
    }

    /// The anchor on the side the scan starts from.
    pub fn leading_anchor(&self) -> Option<&Anchor> {
        match self.direction {
            ScanDirection::Forward => self.after.as_ref(),
            ScanDirection::Backward => self.before.as_ref(),
        }
    }
}

fn check_page_size(n: i64) -> anyhow::Result<usize> {
    if n <= 0 {
        anyhow::bail!(ErrorMetadata::bad_request(
            "InvalidPageSize",
            format!("Page size must be positive, got {n}"),
        ));
    }
    let max = *PAGINATION_MAX_PAGE_SIZE;
    match usize::try_from(n) {
        Ok(n) if n <= max => Ok(n),
        _ => anyhow::bail!(ErrorMetadata::bad_request(
            "PageSizeTooLarge",
            format!("Page size {n} exceeds the maximum of {max}"),
        )),
    }
}

fn anchor(cursor: &Cursor, field: SortField) -> anyhow::Result<Anchor> {
    let decoded = decode_cursor(cursor)?;
    if let Some(tagged) = decoded.sort_field.filter(|tagged| *tagged != field) {
        anyhow::bail!(ErrorMetadata::bad_request(
            "CursorSortMismatch",
            format!("Cursor was issued for a listing sorted by {tagged}, not {field}"),
        ));
    }
    let key = match (decoded.key, decoded.sort_field) {
        _ if field == SortField::Id => AnchorKey::IdentityOnly,
        (Some(key), _) => AnchorKey::Value(key),
        (None, Some(_)) => AnchorKey::Missing,
        (None, None) => AnchorKey::IdentityOnly,
    };
    Ok(Anchor {
        identity: decoded.identity,
        key,
    })
}
