//! Telemetry sink handed to the dispatcher and the per-job lock.
//!
//! Components report what happened through a [`TransitionObserver`] they
//! were given at construction instead of reaching for global state. The
//! default [`TracingObserver`] turns each callback into `tracing` events and
//! OTel metrics; tests can substitute a recorder.

use std::time::Duration;

use opentelemetry::KeyValue;
use tracing::Span;

use super::job as spans;
use super::metrics;
use crate::error::Error;
use crate::model::{JobId, JobStatus, JobUpdate};

pub trait TransitionObserver: Send + Sync {
    /// The per-job lock was granted after waiting `waited`.
    fn lock_acquired(&self, job: &JobId, waited: Duration);

    /// A transition was committed to the store.
    fn transition_applied(&self, job: &JobId, event: &str, from: JobStatus, update: &JobUpdate);

    /// An unknown event type was acknowledged without a state change.
    fn event_acknowledged(&self, job: &JobId, event: &str, status: JobStatus);

    /// Handling ended with an error.
    fn event_failed(&self, job: &JobId, event: &str, error: &Error);

    /// A store write finished, successfully or not.
    fn store_write(&self, job: &JobId, elapsed: Duration, ok: bool);
}

/// Reports through `tracing` and the OTel meter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransitionObserver for TracingObserver {
    fn lock_acquired(&self, job: &JobId, waited: Duration) {
        let waited_ms = waited.as_secs_f64() * 1000.0;
        metrics::lock_wait_ms().record(waited_ms, &[]);
        tracing::debug!(job_id = %job, waited_ms, "job lock acquired");
    }

    fn transition_applied(&self, job: &JobId, event: &str, from: JobStatus, update: &JobUpdate) {
        let span = Span::current();
        spans::record_state_transition(&span, from.as_str(), update.status.as_str());
        spans::record_status(&span, update.status.as_str());

        metrics::job_transitions().add(
            1,
            &[
                KeyValue::new("from", from.as_str()),
                KeyValue::new("to", update.status.as_str()),
            ],
        );
        metrics::events_received().add(
            1,
            &[
                KeyValue::new("event", event.to_string()),
                KeyValue::new("outcome", "applied"),
            ],
        );

        let fields = update.written_fields().join(",");
        tracing::info!(
            job_id = %job,
            event,
            from = %from,
            to = %update.status,
            fields = %fields,
            "job transitioned"
        );
    }

    fn event_acknowledged(&self, job: &JobId, event: &str, status: JobStatus) {
        spans::record_status(&Span::current(), status.as_str());
        metrics::events_received().add(
            1,
            &[
                KeyValue::new("event", event.to_string()),
                KeyValue::new("outcome", "acknowledged"),
            ],
        );
        tracing::warn!(job_id = %job, event, status = %status, "unrecognized event acknowledged");
    }

    fn event_failed(&self, job: &JobId, event: &str, error: &Error) {
        let outcome = match error {
            Error::JobNotFound(_) => "not_found",
            Error::InvalidTransition { .. } | Error::InvalidEvent(_) => "rejected",
            _ => "error",
        };
        metrics::events_received().add(
            1,
            &[
                KeyValue::new("event", event.to_string()),
                KeyValue::new("outcome", outcome),
            ],
        );
        if error.is_storage() {
            tracing::error!(job_id = %job, event, %error, "event handling failed");
        } else {
            tracing::warn!(job_id = %job, event, %error, "event rejected");
        }
    }

    fn store_write(&self, job: &JobId, elapsed: Duration, ok: bool) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        metrics::store_write_ms().record(
            elapsed_ms,
            &[KeyValue::new("result", if ok { "ok" } else { "error" })],
        );
        tracing::debug!(job_id = %job, elapsed_ms, ok, "job store write");
    }
}
