//! Event handling span helpers.

use tracing::Span;

use crate::model::JobId;

/// Start a span covering one event from admission to acknowledgment.
///
/// `job.status` is declared empty and filled by [`record_status`].
pub fn start_event_span(event_type: &str, job_id: &JobId) -> Span {
    tracing::info_span!(
        "job.event",
        "event.type" = event_type,
        "job.id" = %job_id,
        "job.status" = tracing::field::Empty,
    )
}

/// Record the status the job ended up in.
pub fn record_status(span: &Span, status: &str) {
    span.record("job.status", status);
}

/// Emit a transition event scoped to the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
