//! Event dispatcher: turns a stage notification into at most one job write.
//!
//! Every event runs the same sequence under the job's lock: read the job,
//! plan the transition, write it. The lock is requested before anything is
//! spawned, so events for one job are applied in the order they reached the
//! dispatcher. Once the lock is held, the sequence is spawned as its own
//! task and finishes even if the caller stops waiting; a half-applied
//! transition is never left behind by a dropped request.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;

use super::guard::{JobLockGuard, JobLocks};
use super::transition::{self, Plan, TransitionMode};
use crate::error::{Error, Result};
use crate::model::{JobId, JobStatus, JobUpdate, PipelineEvent, WebhookEvent};
use crate::store::JobStore;
use crate::telemetry::TransitionObserver;
use crate::telemetry::job::start_event_span;

/// Outcome of applying one event to one job.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// The transition was committed.
    Applied {
        previous: JobStatus,
        update: JobUpdate,
    },
    /// Unknown event type. Nothing was written.
    Acknowledged { status: JobStatus },
}

impl TransitionResult {
    /// Status of the job after the event.
    pub fn status(&self) -> JobStatus {
        match self {
            TransitionResult::Applied { update, .. } => update.status,
            TransitionResult::Acknowledged { status } => *status,
        }
    }
}

/// Response body returned to the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&TransitionResult> for Acknowledgement {
    fn from(result: &TransitionResult) -> Self {
        match result {
            TransitionResult::Applied { update, .. } => Self {
                success: true,
                status: Some(update.status),
                message: None,
            },
            TransitionResult::Acknowledged { .. } => Self {
                success: true,
                status: None,
                message: Some("Event acknowledged".to_string()),
            },
        }
    }
}

/// Routes events to the state machine, one job at a time.
///
/// Cheap to clone; clones share the store, the lock table and the observer.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn JobStore>,
    locks: Arc<JobLocks>,
    mode: TransitionMode,
    observer: Arc<dyn TransitionObserver>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        mode: TransitionMode,
        observer: Arc<dyn TransitionObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                locks: Arc::new(JobLocks::new(Arc::clone(&observer))),
                mode,
                observer,
            }),
        }
    }

    /// Handle a webhook envelope and build the reply for the event source.
    pub async fn dispatch(&self, envelope: &WebhookEvent) -> Result<Acknowledgement> {
        let result = self
            .apply_event(&envelope.job_id(), &envelope.event, &envelope.data)
            .await?;
        Ok(Acknowledgement::from(&result))
    }

    /// Apply a raw event type and data bag to a job.
    pub async fn apply_event(
        &self,
        job_id: &JobId,
        event_type: &str,
        data: &serde_json::Value,
    ) -> Result<TransitionResult> {
        if job_id.as_str().is_empty() {
            return Err(Error::InvalidEvent("job id must not be empty".to_string()));
        }
        if event_type.is_empty() {
            return Err(Error::InvalidEvent("event type must not be empty".to_string()));
        }
        self.apply(job_id.clone(), PipelineEvent::parse(event_type, data))
            .await
    }

    /// Apply an already parsed event to a job.
    ///
    /// Waiting for the job's lock can be abandoned by dropping the returned
    /// future. Once the lock is granted the transition runs to completion,
    /// even if the future is dropped.
    pub async fn apply(&self, job_id: JobId, event: PipelineEvent) -> Result<TransitionResult> {
        let inner = Arc::clone(&self.inner);
        let span = start_event_span(event.event_type(), &job_id);

        let guard = inner
            .locks
            .acquire(&job_id)
            .instrument(span.clone())
            .await;

        let task = tokio::spawn(
            async move {
                let result = inner.apply_locked(guard, &job_id, &event).await;
                if let Err(ref error) = result {
                    inner
                        .observer
                        .event_failed(&job_id, event.event_type(), error);
                }
                result
            }
            .instrument(span),
        );

        task.await
            .map_err(|e| Error::Other(format!("transition task aborted: {e}")))?
    }
}

impl Inner {
    async fn apply_locked(
        &self,
        _guard: JobLockGuard,
        job_id: &JobId,
        event: &PipelineEvent,
    ) -> Result<TransitionResult> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| Error::JobNotFound(job_id.clone()))?;

        let update = match transition::plan(&job, event, self.mode)? {
            Plan::Apply(update) => update,
            Plan::Acknowledge => {
                self.observer
                    .event_acknowledged(job_id, event.event_type(), job.status);
                return Ok(TransitionResult::Acknowledged { status: job.status });
            }
        };

        let started = Instant::now();
        let written = self.store.update(job_id, &update).await;
        self.observer
            .store_write(job_id, started.elapsed(), written.is_ok());
        written?;

        self.observer
            .transition_applied(job_id, event.event_type(), job.status, &update);

        Ok(TransitionResult::Applied {
            previous: job.status,
            update,
        })
    }
}
