//! Common functions for metrics logging.
//!
//! We follow [Prometheus's conventions](https://prometheus.io/docs/practices/naming/) for metrics
//! names. In particular,
//!
//! 1. Metrics may only contain alphanumerics and underscores.
//! 2. Metrics are automatically prefixed with `SERVICE_NAME`.
//! 3. Suffix metrics with their units (e.g. `_seconds`, `_rows`, `_total`).
//!    See `ALLOWED_SUFFIXES` for more detail.
//!
//! Crates that record metrics keep them in a `metrics` module whose interface
//! is high level ("this event happened") rather than raw metric names.
use std::{
    borrow::Cow,
    collections::HashSet,
    env,
    ops::Deref,
    sync::LazyLock,
};

use parking_lot::RwLock;
use prometheus::Registry;

use crate::{
    MetricLabel,
    log_counter_with_labels,
    register_counter,
};

const ALLOWED_SUFFIXES: &[&str] = &[
    // Always use `_seconds` for time.
    "_seconds",
    // Always use `_bytes` for data lengths.
    "_bytes",
    // Database units.
    "_documents",
    "_rows",
    "_queries",
    // Networking units.
    "_requests",
    "_timeouts",
    // General units.
    "_errors",
    "_reads",
    // Use `_total` as a generic unit-less count that doesn't fit into a unit above.
    "_total",
];

/// Prefix for every metric exported by this process.
pub static SERVICE_NAME: LazyLock<String> =
    LazyLock::new(|| env::var("SERVICE_NAME").unwrap_or_else(|_| "reearth".to_owned()));

pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let labels = env::var("DEPLOYMENT_NAME").ok().map(|deployment| {
        [("deployment".to_owned(), deployment)]
            .into_iter()
            .collect()
    });
    Registry::new_custom(Some(SERVICE_NAME.replace('-', "_")), labels)
        .expect("Failed to initialize Prometheus metrics registry")
});

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MetricName(Cow<'static, str>);

impl MetricName {
    pub const fn new(name: &'static str) -> Self {
        validate_metric_name(name);
        Self(Cow::Borrowed(name))
    }
}

impl Deref for MetricName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0[..]
    }
}

const fn ends_with(s: &[u8], suffix: &[u8]) -> bool {
    if s.len() < suffix.len() {
        return false;
    }
    let s_base = s.len() - suffix.len();
    let mut i = 0;
    while i < suffix.len() {
        if s[s_base + i] != suffix[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn validate_metric_name(name: &str) {
    let name_bytes = name.as_bytes();

    let mut i = 0;
    while i < name_bytes.len() {
        let c = name_bytes[i];
        if !(c.is_ascii_alphanumeric() || c == b'_') {
            panic!("Metric names can only contain alphanumeric characters and underscores");
        }
        i += 1;
    }

    let mut i = 0;
    let mut found_suffix = false;
    while i < ALLOWED_SUFFIXES.len() {
        if ends_with(name_bytes, ALLOWED_SUFFIXES[i].as_bytes()) {
            found_suffix = true;
            break;
        }
        i += 1;
    }
    if !found_suffix {
        panic!(
            "Metric names must end with their units as a suffix (e.g. `_seconds`, `_rows`, \
             `_total`)"
        );
    }
}

// Use a macro to force metric name validation to happen at compile time.
#[macro_export]
macro_rules! metric_name {
    ($name: expr) => {{
        use $crate::MetricName;
        const METRIC_NAME: MetricName = MetricName::new($name);
        METRIC_NAME
    }};
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetricHelp(&'static str);

impl MetricHelp {
    pub const fn new(help_str: &'static str) -> Self {
        if help_str.is_empty() {
            panic!("Metric help strings must be nonempty");
        }
        Self(help_str)
    }
}

impl Deref for MetricHelp {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

#[macro_export]
macro_rules! metric_help {
    ($help: literal) => {{
        use $crate::MetricHelp;
        const METRIC_HELP: MetricHelp = MetricHelp::new($help);
        METRIC_HELP
    }};
}

register_counter!(
    INVALID_METRIC_TOTAL,
    "Count of metrics that failed to be reported",
    &["metric_name"]
);

// Only log each broken metric once, it could easily flood the logs otherwise.
static METRICS_ERROR_ONCE: LazyLock<RwLock<HashSet<String>>> = LazyLock::new(Default::default);
pub fn log_invalid_metric(name: String, error: prometheus::Error) {
    log_counter_with_labels(
        &INVALID_METRIC_TOTAL,
        1,
        vec![MetricLabel::new("metric_name", name.clone())],
    );
    if METRICS_ERROR_ONCE.read().contains(&name) {
        return;
    }
    if METRICS_ERROR_ONCE.write().insert(name.clone()) {
        let msg = format!("Failed to record metric {name:?}: {error}");
        if cfg!(any(test, feature = "testing")) {
            panic!("{msg}");
        }
        let err = anyhow::anyhow!(error).context(msg);
        tracing::error!("{:?}", err);
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_text() -> anyhow::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    Ok(encoder.encode_to_string(&METRICS_REGISTRY.gather())?)
}

#[cfg(test)]
mod tests {
    use super::gather_text;
    use crate::{
        MetricLabel,
        log_counter_with_labels,
        register_counter,
    };

    register_counter!(
        METRICS_SELF_TEST_TOTAL,
        "Counter used by the metrics crate tests",
        &["kind"]
    );

    #[test]
    fn test_registered_counter_is_exported() -> anyhow::Result<()> {
        log_counter_with_labels(
            &METRICS_SELF_TEST_TOTAL,
            2,
            vec![MetricLabel::new_const("kind", "unit")],
        );
        let text = gather_text()?;
        assert!(text.contains("metrics_self_test_total"), "{text}");
        Ok(())
    }
}
