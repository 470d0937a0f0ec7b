//! Error types for jobflow.

use thiserror::Error;

use crate::model::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum Error {
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("invalid transition for job {job}: {event} not accepted in {from}")]
    InvalidTransition {
        job: JobId,
        event: String,
        from: JobStatus,
    },

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The job store failed to read or commit.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
