//! Metric instrument factories for jobflow.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created from the `"jobflow"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("jobflow")
}

/// Counter: webhook events handled by the dispatcher.
/// Labels: `event`, `outcome` ("applied" | "acknowledged" | "not_found" | "rejected" | "error").
pub fn events_received() -> Counter<u64> {
    meter()
        .u64_counter("jobflow.events.received")
        .with_description("Number of pipeline events handled")
        .build()
}

/// Counter: job status transitions written to the store.
/// Labels: `from`, `to`.
pub fn job_transitions() -> Counter<u64> {
    meter()
        .u64_counter("jobflow.job.transitions")
        .with_description("Number of job status transitions")
        .build()
}

/// Histogram: time spent waiting for a per-job lock.
pub fn lock_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("jobflow.lock.wait_ms")
        .with_description("Time spent waiting for the per-job lock")
        .with_unit("ms")
        .build()
}

/// Histogram: job store write latency.
/// Labels: `result` ("ok" | "error").
pub fn store_write_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("jobflow.store.write_ms")
        .with_description("Job store write duration in milliseconds")
        .with_unit("ms")
        .build()
}
