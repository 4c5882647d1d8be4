use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static REGISTRATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auth_registrations_total",
        "Total users registered"
    )
    .expect("register registrations_total")
});

pub static LOGINS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "auth_logins_total",
        "Login attempts by outcome",
        &["outcome"]
    )
    .expect("register logins_total")
});

pub static SESSION_LOOKUPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auth_session_lookups_total",
        "Total successful session lookups"
    )
    .expect("register session_lookups_total")
});

pub static AUTH_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "auth_errors_total",
        "Auth failures by kind",
        &["kind"]
    )
    .expect("register auth_errors_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
