//! Code for interacting with our metrics logging
mod labels;
mod macros;
mod metrics;
mod reporting;
mod timer;

pub use crate::{
    labels::*,
    metrics::*,
    reporting::{
        get_desc,
        log_counter_with_labels,
        log_distribution,
        log_distribution_with_labels,
    },
    timer::{
        StatusTimer,
        Timer,
    },
};
pub use paste::paste;
pub use prometheus;
