//! Core data model.
//!
//! A job is one content item moving through the pipeline. Events are the
//! transient notifications that external stages send about it.

pub mod event;
pub mod job;

pub use event::{PipelineEvent, WebhookEvent};
pub use job::{Job, JobId, JobStatus, JobUpdate};
