//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - SOAP transport (requests, latency)
//! - Ticket renewal (freshness checks, authentications)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// SOAP Transport Metrics
// =============================================================================

/// SOAP requests total by service, operation and status.
pub static SOAP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("afipws_soap_requests_total", "Total SOAP requests"),
        &["service", "operation", "status"], // status: "success", "fault", "error"
    )
    .unwrap()
});

/// SOAP request latency in seconds.
pub static SOAP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "afipws_soap_request_duration_seconds",
            "SOAP request latency",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

// =============================================================================
// Renewal Metrics
// =============================================================================

/// Ticket freshness checks by service and outcome.
pub static RENEWAL_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "afipws_renewal_checks_total",
            "Total access ticket freshness checks",
        ),
        &["service", "outcome"], // "valid", "renewed", "failed"
    )
    .unwrap()
});

/// Authentications by service and result.
pub static AUTHENTICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "afipws_authentications_total",
            "Total authentication attempts",
        ),
        &["service", "result"], // "success", "failed"
    )
    .unwrap()
});

/// Full authentication duration (request, signing, login) in seconds.
pub static LOGIN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "afipws_login_duration_seconds",
            "Duration of a full authentication",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["service"],
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Transport
        Box::new(SOAP_REQUESTS.clone()),
        Box::new(SOAP_REQUEST_DURATION.clone()),
        // Renewal
        Box::new(RENEWAL_CHECKS.clone()),
        Box::new(AUTHENTICATIONS.clone()),
        Box::new(LOGIN_DURATION.clone()),
    ]
}
