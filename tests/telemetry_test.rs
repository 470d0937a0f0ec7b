//! Integration tests for telemetry initialization and span helpers.

use std::time::Duration;

use jobflow::error::Error;
use jobflow::model::{JobId, JobStatus, JobUpdate};
use jobflow::telemetry::{TracingObserver, TransitionObserver};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second init
    // returns Err, which is acceptable here.
    let config = jobflow::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "jobflow-test".to_string(),
        log_level: "debug".to_string(),
    };
    if let Ok(guard) = jobflow::telemetry::init_telemetry(config) {
        tracing::info!("telemetry test event");
        guard.force_flush();
    }
}

#[test]
fn event_span_records_transition() {
    let id = JobId::from("J1");
    let span = jobflow::telemetry::job::start_event_span("tts_completed", &id);
    jobflow::telemetry::job::record_state_transition(&span, "TTS_PROCESSING", "VIDEO_RENDERING");
    jobflow::telemetry::job::record_status(&span, "VIDEO_RENDERING");
}

#[test]
fn tracing_observer_handles_every_callback() {
    let observer = TracingObserver;
    let id = JobId::from("J1");
    let update = JobUpdate {
        audio_url: Some("a.mp3".to_string()),
        ..JobUpdate::status(JobStatus::VideoRendering)
    };

    observer.lock_acquired(&id, Duration::from_millis(3));
    observer.store_write(&id, Duration::from_millis(7), true);
    observer.transition_applied(&id, "tts_completed", JobStatus::TtsProcessing, &update);
    observer.event_acknowledged(&id, "mystery", JobStatus::VideoRendering);
    observer.event_failed(&id, "failed", &Error::JobNotFound(id.clone()));
    observer.event_failed(&id, "failed", &Error::Storage("down".to_string()));
}
