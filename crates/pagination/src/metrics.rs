use metrics::{
    MetricLabel,
    StatusTimer,
    Timer,
    log_counter_with_labels,
    register_counter,
    register_histogram,
};

register_histogram!(
    PAGINATION_REQUEST_SECONDS,
    "Time taken to serve one page of a listing query",
    &["resource", "status"]
);
pub fn paginate_timer(resource: &'static str) -> StatusTimer {
    let mut timer = StatusTimer::new(&PAGINATION_REQUEST_SECONDS);
    timer.add_label(MetricLabel::new_const("resource", resource));
    timer
}

register_histogram!(
    PAGINATION_STORE_QUERY_SECONDS,
    "Time taken by the count and range queries of one page"
);
pub fn store_query_timer() -> Timer {
    Timer::new(&PAGINATION_STORE_QUERY_SECONDS)
}

register_counter!(
    PAGINATION_UNREADABLE_SCOPE_TOTAL,
    "Listing queries answered with an empty page because the scope is not readable",
    &["resource"]
);
pub fn log_unreadable_scope(resource: &'static str) {
    log_counter_with_labels(
        &PAGINATION_UNREADABLE_SCOPE_TOTAL,
        1,
        vec![MetricLabel::new_const("resource", resource)],
    );
}

register_counter!(
    PAGINATION_POST_FILTER_DROPPED_ROWS,
    "Rows returned by the store but rejected by the row-level visibility check",
    &["resource"]
);
pub fn log_post_filter_dropped(resource: &'static str, dropped: usize) {
    if dropped == 0 {
        return;
    }
    log_counter_with_labels(
        &PAGINATION_POST_FILTER_DROPPED_ROWS,
        dropped as u64,
        vec![MetricLabel::new_const("resource", resource)],
    );
}

register_counter!(
    PAGINATION_CURSOR_KEY_FALLBACK_TOTAL,
    "Cursor keys that failed to parse as their field's type and were compared as text",
    &["field"]
);
pub fn log_cursor_key_fallback(field: &'static str) {
    log_counter_with_labels(
        &PAGINATION_CURSOR_KEY_FALLBACK_TOTAL,
        1,
        vec![MetricLabel::new_const("field", field)],
    );
}
