use std::collections::HashMap;

use prometheus::{
    Histogram,
    HistogramVec,
    IntCounterVec,
    core::Collector,
};

use crate::{
    MetricLabel,
    labels::Labels,
    log_invalid_metric,
};

pub fn log_counter_with_labels(
    prometheus_counter: &IntCounterVec,
    increment: u64,
    labels: Labels,
) {
    match prometheus_counter.get_metric_with(
        &labels
            .iter()
            .map(MetricLabel::split_key_value)
            .collect::<HashMap<_, _>>(),
    ) {
        Ok(metric) => metric.inc_by(increment),
        Err(e) => {
            log_invalid_metric(get_desc(prometheus_counter), e);
        },
    }
}

pub fn log_distribution(prometheus_histogram: &Histogram, value: f64) {
    prometheus_histogram.observe(value);
}

pub fn log_distribution_with_labels(
    prometheus_histogram: &HistogramVec,
    value: f64,
    labels: Labels,
) {
    match prometheus_histogram.get_metric_with(
        &labels
            .iter()
            .map(MetricLabel::split_key_value)
            .collect::<HashMap<_, _>>(),
    ) {
        Ok(metric) => metric.observe(value),
        Err(e) => {
            log_invalid_metric(get_desc(prometheus_histogram), e);
        },
    }
}

pub fn get_desc<M: Collector>(metric: &M) -> String {
    let unknown = "unknown".to_string();
    metric
        .desc()
        .first()
        .map(|d| d.fq_name.clone())
        .unwrap_or(unknown)
}
