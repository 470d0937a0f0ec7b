//! Job store boundary.
//!
//! The orchestration core only needs keyed reads and partial writes. Each
//! `update` call must commit atomically: the status and every provided field
//! land together, or nothing does.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Job, JobId, JobUpdate};

pub use memory::MemoryJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a job, `None` if no such id exists.
    async fn get(&self, id: &JobId) -> Result<Option<Job>>;

    /// Write a status change and its payload fields in one commit.
    ///
    /// Fields left `None` in `update` are not touched.
    async fn update(&self, id: &JobId, update: &JobUpdate) -> Result<()>;

    /// Persist a new job. Fails if the id is already taken.
    async fn create(&self, job: Job) -> Result<Job>;
}
