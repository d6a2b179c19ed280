use std::{
    cmp::Ordering,
    fmt,
};

use chrono::{
    DateTime,
    SecondsFormat,
    Utc,
};

/// A scalar stored in a record field, as seen by predicates and sorting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    String(String),
    Int64(i64),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int64(_) => "int64",
            Value::Timestamp(_) => "timestamp",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Position of this value's type in the store's sort order: numbers,
    /// then strings, then booleans, then dates.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Int64(_) => 0,
            Value::String(_) => 1,
            Value::Boolean(_) => 2,
            Value::Timestamp(_) => 3,
        }
    }

    /// Orders values of different types by type, so that a mixed column
    /// still sorts deterministically. Range predicates use `partial_cmp`
    /// instead, which never matches across types.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            Value::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int64(n.into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
