//! Sort fields, their typed key values, and the canonical orderings used by
//! range queries.
//!
//! Every listing is ordered by a `(sort field, identity)` pair. The identity
//! tiebreaker makes the order total, which keyset pagination relies on.

use std::{
    cmp::Ordering,
    fmt,
};

use anyhow::Context;
use chrono::{
    DateTime,
    SecondsFormat,
    Utc,
};
use errors::ErrorMetadata;

use crate::{
    store::Record,
    value::Value,
};

/// Document field holding each record's identity.
pub const ID_FIELD: &str = "id";

/// A field a listing may be ordered by. The rendered name doubles as the
/// document field name and as the tag carried in cursor tokens.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(any(test, feature = "testing"), derive(proptest_derive::Arbitrary))]
pub enum SortField {
    Id,
    Name,
    Size,
    CreatedAt,
    UpdatedAt,
    Scene,
}

/// How the text form of a sort key is parsed back into a comparable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Integer,
    Timestamp,
}

impl SortField {
    pub fn field_name(&self) -> &'static str {
        (*self).into()
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            SortField::Id | SortField::Name | SortField::Scene => ValueType::Text,
            SortField::Size => ValueType::Integer,
            SortField::CreatedAt | SortField::UpdatedAt => ValueType::Timestamp,
        }
    }

    /// Parses a sort field named by a client, e.g. `"createdAt"`.
    pub fn parse(name: &str) -> anyhow::Result<Self> {
        name.trim().parse().map_err(|_| {
            anyhow::anyhow!(ErrorMetadata::bad_request(
                "UnsupportedSortField",
                format!("Unknown sort field {name:?}"),
            ))
        })
    }
}

/// Sort direction of a range query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "testing"), derive(proptest_derive::Arbitrary))]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    }

    pub fn reverse(&self) -> Self {
        match self {
            Order::Asc => Order::Desc,
            Order::Desc => Order::Asc,
        }
    }
}

/// The sort key of a single record: the value of the active sort field,
/// tagged with which field it came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SortKey {
    Identity(String),
    Name(String),
    Size(i64),
    CreatedAt(DateTime<Utc>),
    UpdatedAt(DateTime<Utc>),
    Scene(String),
}

impl SortKey {
    pub fn field(&self) -> SortField {
        match self {
            SortKey::Identity(_) => SortField::Id,
            SortKey::Name(_) => SortField::Name,
            SortKey::Size(_) => SortField::Size,
            SortKey::CreatedAt(_) => SortField::CreatedAt,
            SortKey::UpdatedAt(_) => SortField::UpdatedAt,
            SortKey::Scene(_) => SortField::Scene,
        }
    }

    /// The text form embedded in cursor tokens. Identity keys are already
    /// carried by the cursor's identity, so their text form is empty.
    pub fn to_cursor_string(&self) -> String {
        match self {
            SortKey::Identity(_) => String::new(),
            SortKey::Name(s) | SortKey::Scene(s) => s.clone(),
            SortKey::Size(n) => n.to_string(),
            SortKey::CreatedAt(ts) | SortKey::UpdatedAt(ts) => {
                ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
            },
        }
    }

    /// Parses the text form of a key for `field`. This is the single place
    /// where key text becomes a typed value.
    pub fn parse(field: SortField, raw: &str) -> anyhow::Result<Self> {
        let key = match field.value_type() {
            ValueType::Text => match field {
                SortField::Id => SortKey::Identity(raw.to_owned()),
                SortField::Scene => SortKey::Scene(raw.to_owned()),
                _ => SortKey::Name(raw.to_owned()),
            },
            ValueType::Integer => SortKey::Size(
                raw.parse()
                    .with_context(|| format!("{raw:?} is not an integer"))?,
            ),
            ValueType::Timestamp => {
                let ts = DateTime::parse_from_rfc3339(raw)
                    .with_context(|| format!("{raw:?} is not an RFC 3339 timestamp"))?
                    .with_timezone(&Utc);
                match field {
                    SortField::UpdatedAt => SortKey::UpdatedAt(ts),
                    _ => SortKey::CreatedAt(ts),
                }
            },
        };
        Ok(key)
    }

    /// Reads the key for `field` out of a stored value. Returns `None` when
    /// the stored value has the wrong type.
    pub fn from_value(field: SortField, value: Value) -> Option<Self> {
        let key = match (field, value) {
            (SortField::Id, Value::String(s)) => SortKey::Identity(s),
            (SortField::Name, Value::String(s)) => SortKey::Name(s),
            (SortField::Scene, Value::String(s)) => SortKey::Scene(s),
            (SortField::Size, Value::Int64(n)) => SortKey::Size(n),
            (SortField::CreatedAt, Value::Timestamp(ts)) => SortKey::CreatedAt(ts),
            (SortField::UpdatedAt, Value::Timestamp(ts)) => SortKey::UpdatedAt(ts),
            _ => return None,
        };
        Some(key)
    }

    pub fn into_value(self) -> Value {
        match self {
            SortKey::Identity(s) | SortKey::Name(s) | SortKey::Scene(s) => Value::String(s),
            SortKey::Size(n) => Value::Int64(n),
            SortKey::CreatedAt(ts) | SortKey::UpdatedAt(ts) => Value::Timestamp(ts),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Identity(id) => write!(f, "{}={id}", self.field()),
            _ => write!(f, "{}={}", self.field(), self.to_cursor_string()),
        }
    }
}

/// The ordering of a range query: the sort field with the identity as
/// tiebreaker, both in the same direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: Order,
}

impl SortSpec {
    pub fn new(field: SortField, order: Order) -> Self {
        Self { field, order }
    }

    /// The `(field, order)` pairs a store should sort by, most significant
    /// first.
    pub fn keys(&self) -> Vec<(&'static str, Order)> {
        if self.field == SortField::Id {
            vec![(ID_FIELD, self.order)]
        } else {
            vec![(self.field.field_name(), self.order), (ID_FIELD, self.order)]
        }
    }

    /// Compares two records in this ordering. Missing fields sort first.
    pub fn compare<R: Record>(&self, a: &R, b: &R) -> Ordering {
        let by_field = if self.field == SortField::Id {
            Ordering::Equal
        } else {
            let name = self.field.field_name();
            match (a.field(name), b.field(name)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        };
        self.order
            .apply(by_field.then_with(|| a.identity().cmp(b.identity())))
    }
}
