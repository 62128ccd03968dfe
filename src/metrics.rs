use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref SUBMISSIONS_TOTAL: Counter = register_counter!(
        "save_text_submissions_total",
        "Total number of save-text requests"
    )
    .unwrap();
    pub static ref SAVED_TOTAL: Counter =
        register_counter!("save_text_saved_total", "Entries written to the store").unwrap();
    pub static ref DUPLICATES_TOTAL: Counter = register_counter!(
        "save_text_duplicates_total",
        "Submissions suppressed as duplicates"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "save_text_rate_limited_total",
        "Submissions rejected by the rate limiter"
    )
    .unwrap();
    pub static ref VALIDATION_FAILURES_TOTAL: Counter = register_counter!(
        "save_text_validation_failures_total",
        "Submissions with an invalid body"
    )
    .unwrap();
    pub static ref STORE_ERRORS_TOTAL: Counter = register_counter!(
        "save_text_store_errors_total",
        "Failed store reads and writes"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "save_text_request_latency_seconds",
        "Save-text latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_TRACKED: Gauge = register_gauge!(
        "save_text_rate_limit_tracked",
        "Identities currently held by the rate limiter"
    )
    .unwrap();
}

// Prometheus text format for every registered metric
pub fn gather() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
