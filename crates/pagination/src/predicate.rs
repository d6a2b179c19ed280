use std::fmt;

use errors::ErrorMetadata;
use itertools::Itertools;
use regex::{
    Regex,
    RegexBuilder,
};

use crate::{
    store::Record,
    value::Value,
};

/// Case-insensitive substring match. The keyword is escaped, so it is
/// always matched literally.
#[derive(Clone, Debug)]
pub struct KeywordMatch {
    keyword: String,
    regex: Regex,
}

impl KeywordMatch {
    pub fn new(keyword: &str) -> anyhow::Result<Self> {
        let regex = RegexBuilder::new(&regex::escape(keyword))
            .case_insensitive(true)
            .size_limit(1 << 20)
            .build()
            .map_err(|e| {
                anyhow::anyhow!(ErrorMetadata::bad_request(
                    "InvalidKeyword",
                    format!("Keyword cannot be searched for: {e}"),
                ))
            })?;
        Ok(Self {
            keyword: keyword.to_owned(),
            regex,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The pattern a regex-capable store should evaluate.
    pub fn pattern(&self) -> String {
        format!("(?i){}", regex::escape(&self.keyword))
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for KeywordMatch {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword
    }
}

/// A store-agnostic filter over record fields.
///
/// Comparisons between values of different types never match. `Ne` also
/// matches records that lack the field. `Exists(field, false)` matches only
/// records that lack it.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Lt(String, Value),
    In(String, Vec<Value>),
    Exists(String, bool),
    ContainsIgnoreCase(String, KeywordMatch),
}

impl Predicate {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Predicate::Eq(field.to_owned(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Predicate::Ne(field.to_owned(), value.into())
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Predicate::Gt(field.to_owned(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Predicate::Lt(field.to_owned(), value.into())
    }

    pub fn exists(field: &str, exists: bool) -> Self {
        Predicate::Exists(field.to_owned(), exists)
    }

    /// Conjunction that flattens nested `And`s and unwraps a single term.
    pub fn all(terms: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat: Vec<_> = terms
            .into_iter()
            .flat_map(|p| match p {
                Predicate::And(inner) => inner,
                p => vec![p],
            })
            .collect();
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Predicate::And(flat)
    }

    /// Disjunction that unwraps a single term.
    pub fn any(terms: impl IntoIterator<Item = Predicate>) -> Self {
        let mut terms: Vec<_> = terms.into_iter().collect();
        if terms.len() == 1 {
            return terms.remove(0);
        }
        Predicate::Or(terms)
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Predicate::And(terms) => terms.iter().all(|p| p.matches(record)),
            Predicate::Or(terms) => terms.iter().any(|p| p.matches(record)),
            Predicate::Eq(field, v) => record.field(field).is_some_and(|x| &x == v),
            Predicate::Ne(field, v) => record.field(field).is_none_or(|x| &x != v),
            Predicate::Gt(field, v) => record.field(field).is_some_and(|x| &x > v),
            Predicate::Lt(field, v) => record.field(field).is_some_and(|x| &x < v),
            Predicate::In(field, values) => record
                .field(field)
                .is_some_and(|x| values.contains(&x)),
            Predicate::Exists(field, exists) => record.field(field).is_some() == *exists,
            Predicate::ContainsIgnoreCase(field, keyword) => match record.field(field) {
                Some(Value::String(s)) => keyword.is_match(&s),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(terms) if terms.is_empty() => write!(f, "true"),
            Predicate::And(terms) => write!(f, "({})", terms.iter().join(" AND ")),
            Predicate::Or(terms) if terms.is_empty() => write!(f, "false"),
            Predicate::Or(terms) => write!(f, "({})", terms.iter().join(" OR ")),
            Predicate::Eq(field, v) => write!(f, "{field} == {v}"),
            Predicate::Ne(field, v) => write!(f, "{field} != {v}"),
            Predicate::Gt(field, v) => write!(f, "{field} > {v}"),
            Predicate::Lt(field, v) => write!(f, "{field} < {v}"),
            Predicate::In(field, values) => write!(f, "{field} IN [{}]", values.iter().join(", ")),
            Predicate::Exists(field, true) => write!(f, "{field} EXISTS"),
            Predicate::Exists(field, false) => write!(f, "{field} MISSING"),
            Predicate::ContainsIgnoreCase(field, k) => write!(f, "{field} ~ {:?}", k.keyword()),
        }
    }
}
