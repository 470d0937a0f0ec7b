//! Per-job mutual exclusion.
//!
//! One async mutex per job id, kept in a sharded concurrent map. Events for
//! the same job are granted the lock in the order `acquire` was first
//! polled (tokio's mutex is FIFO); events for different jobs never touch the
//! same lock. A slot is dropped from the map once nobody holds or waits on it.
//!
//! Guards own a handle to the table so they can be moved into a spawned task.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::JobId;
use crate::telemetry::TransitionObserver;

pub struct JobLocks {
    slots: DashMap<JobId, Arc<Mutex<()>>>,
    observer: Arc<dyn TransitionObserver>,
}

impl JobLocks {
    pub fn new(observer: Arc<dyn TransitionObserver>) -> Self {
        Self {
            slots: DashMap::new(),
            observer,
        }
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    ///
    /// The caller's place in the queue is taken on the first poll.
    pub async fn acquire(self: &Arc<Self>, id: &JobId) -> JobLockGuard {
        // Clone out of the map so no shard lock is held across the await.
        let slot = Arc::clone(
            self.slots
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        let started = Instant::now();
        let held = slot.lock_owned().await;
        self.observer.lock_acquired(id, started.elapsed());

        JobLockGuard {
            locks: Arc::clone(self),
            id: id.clone(),
            held: Some(held),
        }
    }

    /// Number of jobs that currently have a lock slot.
    #[cfg(test)]
    fn active(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive hold on one job.
pub struct JobLockGuard {
    locks: Arc<JobLocks>,
    id: JobId,
    held: Option<OwnedMutexGuard<()>>,
}

impl JobLockGuard {
    #[cfg(test)]
    fn job_id(&self) -> &JobId {
        &self.id
    }
}

impl Drop for JobLockGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only sees the map and waiters.
        self.held.take();
        self.locks
            .slots
            .remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TracingObserver;
    use std::time::Duration;

    fn locks() -> Arc<JobLocks> {
        Arc::new(JobLocks::new(Arc::new(TracingObserver)))
    }

    #[tokio::test]
    async fn slot_is_reclaimed_after_release() {
        let locks = locks();
        {
            let guard = locks.acquire(&JobId::from("a")).await;
            assert_eq!(guard.job_id().as_str(), "a");
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn same_job_waits_for_holder() {
        let locks = locks();
        let held = locks.acquire(&JobId::from("a")).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(&JobId::from("a")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn waiters_are_granted_in_first_poll_order() {
        let locks = locks();
        let held = locks.acquire(&JobId::from("a")).await;
        let order = std::sync::Mutex::new(Vec::new());

        let waiter = |n: usize| {
            let locks = Arc::clone(&locks);
            let order = &order;
            async move {
                let _guard = locks.acquire(&JobId::from("a")).await;
                order.lock().unwrap().push(n);
                tokio::task::yield_now().await;
            }
        };
        let release = async move {
            tokio::task::yield_now().await;
            drop(held);
        };

        tokio::join!(waiter(0), waiter(1), waiter(2), waiter(3), release);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn different_jobs_do_not_contend() {
        let locks = locks();
        let _a = locks.acquire(&JobId::from("a")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&JobId::from("b")))
            .await
            .expect("lock on another job must not block");
        assert_eq!(b.job_id().as_str(), "b");
        assert_eq!(locks.active(), 2);
    }
}
