use std::collections::BTreeMap;

use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};

use crate::{
    store::Record,
    value::Value,
};

/// A record held as a plain map of fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestRecord {
    id: String,
    fields: BTreeMap<String, Value>,
}

impl TestRecord {
    pub fn new(id: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_owned(), Value::from(id));
        Self {
            id: id.to_owned(),
            fields,
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_owned(), value.into());
    }
}

impl Record for TestRecord {
    fn identity(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

/// `n` assets in `workspace`, numbered from 1, created one second apart in
/// id order. Ids are `asset-001`, `asset-002`, ...
pub fn assets(workspace: &str, n: usize) -> Vec<TestRecord> {
    let epoch = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default();
    (1..=n)
        .map(|i| {
            TestRecord::new(&format!("asset-{i:03}"))
                .with("team", workspace)
                .with("name", format!("asset {i}"))
                .with("size", (i as i64 * 37) % 101)
                .with("createdat", epoch + TimeDelta::seconds(i as i64))
        })
        .collect()
}
