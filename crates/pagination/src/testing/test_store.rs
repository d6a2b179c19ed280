use std::{
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use cmd_util::env::config_test;
use futures::stream;
use parking_lot::Mutex;

use super::TestRecord;
use crate::{
    predicate::Predicate,
    range::RangeQuery,
    store::{
        DocumentStore,
        Record,
        RecordStream,
    },
};

/// A document store backed by a vector. Clones share state, so a test can
/// keep a handle while a `Paginator` owns another.
#[derive(Clone)]
pub struct TestStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    records: Vec<TestRecord>,
    leaked: Vec<TestRecord>,
    failure: Option<String>,
    latency: Option<Duration>,
    count_calls: usize,
    find_calls: usize,
}

impl TestStore {
    pub fn new() -> Self {
        config_test();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                records: vec![],
                leaked: vec![],
                failure: None,
                latency: None,
                count_calls: 0,
                find_calls: 0,
            })),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = TestRecord>) -> Self {
        let store = Self::new();
        store.inner.lock().records.extend(records);
        store
    }

    /// Inserts or replaces the record with the same identity.
    pub fn upsert(&self, record: TestRecord) {
        let mut inner = self.inner.lock();
        inner.records.retain(|r| r.identity() != record.identity());
        inner.records.push(record);
    }

    /// Returns `record` from every range read inside whose cursor window it
    /// falls, whether or not it matches the scope, as a store with a faulty
    /// index might.
    pub fn leak_into_find(&self, record: TestRecord) {
        self.inner.lock().leaked.push(record);
    }

    /// Makes every following query fail with `message`. `None` heals it.
    pub fn set_failure(&self, message: Option<&str>) {
        self.inner.lock().failure = message.map(str::to_owned);
    }

    /// Delays every following query by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().latency = latency;
    }

    pub fn count_calls(&self) -> usize {
        self.inner.lock().count_calls
    }

    pub fn find_calls(&self) -> usize {
        self.inner.lock().find_calls
    }

    async fn before_query(&self) -> anyhow::Result<()> {
        let (latency, failure) = {
            let inner = self.inner.lock();
            (inner.latency, inner.failure.clone())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = failure {
            anyhow::bail!(message);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for TestStore {
    type Record = TestRecord;

    async fn count(&self, filter: &Predicate) -> anyhow::Result<u64> {
        self.inner.lock().count_calls += 1;
        self.before_query().await?;
        let inner = self.inner.lock();
        Ok(inner.records.iter().filter(|r| filter.matches(*r)).count() as u64)
    }

    async fn find(&self, query: &RangeQuery) -> anyhow::Result<RecordStream<TestRecord>> {
        self.inner.lock().find_calls += 1;
        self.before_query().await?;
        let filter = query.filter();
        let in_window = |r: &TestRecord| query.boundary.as_ref().is_none_or(|b| b.matches(r));
        let mut rows: Vec<_> = {
            let inner = self.inner.lock();
            inner
                .records
                .iter()
                .filter(|r| filter.matches(*r))
                .chain(inner.leaked.iter().filter(|r| in_window(r)))
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| query.sort.compare(a, b));
        rows.truncate(query.limit);
        Ok(Box::pin(stream::iter(rows.into_iter().map(anyhow::Ok))))
    }
}
