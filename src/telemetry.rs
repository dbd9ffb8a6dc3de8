//! Telemetry module for oauthd
//!
//! Prometheus counters for token issuance and bearer validation, exposed
//! through the `/metrics` endpoint.

use crate::{OauthdError, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, TextEncoder, register_int_counter_vec};

/// Access tokens issued, by grant type
static TOKENS_ISSUED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "oauthd_tokens_issued_total",
        "Total number of access tokens issued",
        &["grant_type"]
    )
    .expect("oauthd_tokens_issued_total registers once")
});

/// Token endpoint failures, by wire error code
static TOKEN_REQUESTS_FAILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "oauthd_token_requests_failed_total",
        "Total number of rejected or failed token requests",
        &["error"]
    )
    .expect("oauthd_token_requests_failed_total registers once")
});

/// Bearer validations, by outcome (valid, expired, invalid, error)
static TOKEN_VALIDATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "oauthd_token_validations_total",
        "Total number of bearer token validations",
        &["outcome"]
    )
    .expect("oauthd_token_validations_total registers once")
});

/// Record an issued access token
pub fn record_token_issued(grant_type: &str) {
    TOKENS_ISSUED_TOTAL.with_label_values(&[grant_type]).inc();
}

/// Record a failed token request
pub fn record_token_request_failed(error: &str) {
    TOKEN_REQUESTS_FAILED_TOTAL
        .with_label_values(&[error])
        .inc();
}

/// Record a bearer validation outcome
pub fn record_token_validation(outcome: &str) {
    TOKEN_VALIDATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Get Prometheus metrics in text format
pub fn get_metrics() -> Result<String> {
    // Touch the counters so they appear before their first increment
    Lazy::force(&TOKENS_ISSUED_TOTAL);
    Lazy::force(&TOKEN_REQUESTS_FAILED_TOTAL);
    Lazy::force(&TOKEN_VALIDATIONS_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| OauthdError::config(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| OauthdError::config(format!("Failed to convert metrics to UTF-8: {}", e)))
}
