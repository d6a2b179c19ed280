//! Tunable limits for listing queries.
//!
//! Every knob can be overridden with an environment variable of the same
//! name. Each one documents its bounds so an operator can adjust it safely.
#![deny(missing_docs)]

use std::{
    sync::LazyLock,
    time::Duration,
};

use cmd_util::env::{
    env_config,
    env_config_secs,
};

/// Page size used when the client sends neither `first` nor `last`.
/// Must be at least 1 and at most `PAGINATION_MAX_PAGE_SIZE`.
pub static PAGINATION_DEFAULT_PAGE_SIZE: LazyLock<usize> =
    LazyLock::new(|| env_config("PAGINATION_DEFAULT_PAGE_SIZE", 10));

/// Largest `first`/`last` a client may ask for. Larger requests are rejected
/// rather than clamped so that clients notice.
pub static PAGINATION_MAX_PAGE_SIZE: LazyLock<usize> =
    LazyLock::new(|| env_config("PAGINATION_MAX_PAGE_SIZE", 1000));

/// Upper bound on the count and range queries of a single page when the
/// caller does not supply its own deadline.
pub static PAGINATION_STORE_TIMEOUT: LazyLock<Duration> =
    LazyLock::new(|| env_config_secs("PAGINATION_STORE_TIMEOUT", Duration::from_secs(30)));

/// Longest cursor token accepted from a client, in bytes.
pub static PAGINATION_MAX_CURSOR_LEN: LazyLock<usize> =
    LazyLock::new(|| env_config("PAGINATION_MAX_CURSOR_LEN", 4096));

/// Follow-up range reads one page may issue when the row-level visibility
/// check rejects rows the store returned. Once spent, the page is served
/// with whatever passed, which can understate `has_next_page`.
pub static PAGINATION_MAX_REFILL_QUERIES: LazyLock<usize> =
    LazyLock::new(|| env_config("PAGINATION_MAX_REFILL_QUERIES", 8));
