//! Concurrent delivery: per-job serialization in received order, cross-job
//! parallelism, and transitions that outlive their caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jobflow::engine::{Dispatcher, TransitionMode};
use jobflow::error::{Error, Result};
use jobflow::model::{Job, JobId, JobStatus, JobUpdate};
use jobflow::store::{JobStore, MemoryJobStore};
use jobflow::telemetry::TracingObserver;
use serde_json::json;
use tokio::sync::{Mutex, Notify};

/// A store whose `update` is a non-atomic read-modify-write with a pause in
/// the middle. Two unguarded updates to one job would lose one of them.
struct RacyStore {
    jobs: Mutex<HashMap<JobId, Job>>,
    delay: Duration,
    writes: AtomicU64,
    /// Job whose writes wait for `gate` before committing.
    gated: Option<JobId>,
    gate: Notify,
}

impl RacyStore {
    fn new(delay: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            delay,
            writes: AtomicU64::new(0),
            gated: None,
            gate: Notify::new(),
        }
    }

    fn gated_on(mut self, id: &str) -> Self {
        self.gated = Some(JobId::from(id));
        self
    }
}

#[async_trait]
impl JobStore for RacyStore {
    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        Ok(self.jobs.lock().await.get(id).cloned())
    }

    async fn update(&self, id: &JobId, update: &JobUpdate) -> Result<()> {
        let mut job = self
            .jobs
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::JobNotFound(id.clone()))?;

        if self.gated.as_ref() == Some(id) {
            self.gate.notified().await;
        }
        tokio::time::sleep(self.delay).await;

        job.apply(update);
        self.jobs.lock().await.insert(id.clone(), job);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create(&self, job: Job) -> Result<Job> {
        self.jobs.lock().await.insert(job.id.clone(), job.clone());
        Ok(job)
    }
}

async fn dispatcher_over(store: Arc<RacyStore>, ids: &[&str]) -> Dispatcher {
    for id in ids {
        store.create(Job::new(JobId::from(*id))).await.unwrap();
    }
    Dispatcher::new(store, TransitionMode::Permissive, Arc::new(TracingObserver))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_events_for_one_job_keep_both_field_sets() {
    let store = Arc::new(RacyStore::new(Duration::from_millis(30)));
    let dispatcher = dispatcher_over(store.clone(), &["J1"]).await;

    let script = {
        let d = dispatcher.clone();
        tokio::spawn(async move {
            d.apply_event(
                &JobId::from("J1"),
                "script_generated",
                &json!({"script": "S", "voiceoverText": "V", "title": "T"}),
            )
            .await
        })
    };
    let audio = {
        let d = dispatcher.clone();
        tokio::spawn(async move {
            d.apply_event(&JobId::from("J1"), "tts_completed", &json!({"audioUrl": "a.mp3"}))
                .await
        })
    };

    script.await.unwrap().unwrap();
    audio.await.unwrap().unwrap();

    let job = store.get(&JobId::from("J1")).await.unwrap().unwrap();
    assert_eq!(job.script.as_deref(), Some("S"));
    assert_eq!(job.audio_url.as_deref(), Some("a.mp3"));
    assert!(matches!(
        job.status,
        JobStatus::TtsProcessing | JobStatus::VideoRendering
    ));
    assert_eq!(store.writes.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_of_duplicates_settles_on_one_status() {
    let store = Arc::new(RacyStore::new(Duration::from_millis(2)));
    let dispatcher = dispatcher_over(store.clone(), &["J1"]).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let d = dispatcher.clone();
            tokio::spawn(async move {
                d.apply_event(
                    &JobId::from("J1"),
                    "video_rendered",
                    &json!({"videoUrl": format!("v{i}.mp4")}),
                )
                .await
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().status(), JobStatus::Uploading);
    }

    let job = store.get(&JobId::from("J1")).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Uploading);
    assert!(job.video_url.is_some());
    assert_eq!(store.writes.load(Ordering::SeqCst), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_stuck_job_does_not_block_other_jobs() {
    let store = Arc::new(RacyStore::new(Duration::ZERO).gated_on("A"));
    let dispatcher = dispatcher_over(store.clone(), &["A", "B"]).await;

    let stuck = {
        let d = dispatcher.clone();
        tokio::spawn(async move {
            d.apply_event(&JobId::from("A"), "tts_completed", &json!({"audioUrl": "a"}))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!stuck.is_finished());

    let other = tokio::time::timeout(
        Duration::from_secs(1),
        dispatcher.apply_event(&JobId::from("B"), "tts_completed", &json!({"audioUrl": "b"})),
    )
    .await
    .expect("job B must not wait on job A")
    .unwrap();
    assert_eq!(other.status(), JobStatus::VideoRendering);

    store.gate.notify_one();
    assert_eq!(
        stuck.await.unwrap().unwrap().status(),
        JobStatus::VideoRendering
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_caller_does_not_cancel_transition() {
    let store = Arc::new(RacyStore::new(Duration::from_millis(100)));
    let dispatcher = dispatcher_over(store.clone(), &["J1"]).await;

    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        dispatcher.apply_event(&JobId::from("J1"), "video_rendered", &json!({"videoUrl": "v.mp4"})),
    )
    .await;
    assert!(outcome.is_err(), "caller should have given up first");

    tokio::time::sleep(Duration::from_millis(300)).await;

    let job = store.get(&JobId::from("J1")).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Uploading);
    assert_eq!(job.video_url.as_deref(), Some("v.mp4"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn same_job_events_apply_in_received_order() {
    let store = Arc::new(MemoryJobStore::new());
    let dispatcher = Dispatcher::new(
        store.clone(),
        TransitionMode::Permissive,
        Arc::new(TracingObserver),
    );

    let mut reordered = Vec::new();
    for i in 0..500 {
        let id = JobId::from(format!("job-{i}"));
        store.create(Job::new(id.clone())).await.unwrap();

        // `join!` polls the first delivery before the second.
        let script_payload = json!({"script": "S"});
        let failed_payload = json!({"errorMessage": "boom"});
        let (first, second) = tokio::join!(
            dispatcher.apply_event(&id, "script_generated", &script_payload),
            dispatcher.apply_event(&id, "failed", &failed_payload),
        );
        first.unwrap();
        second.unwrap();

        let job = store.get(&id).await.unwrap().unwrap();
        if job.status != JobStatus::Failed {
            reordered.push(id);
        }
    }
    assert!(reordered.is_empty(), "applied out of order: {reordered:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_lock_wait_writes_nothing() {
    let store = Arc::new(RacyStore::new(Duration::ZERO).gated_on("J1"));
    let dispatcher = dispatcher_over(store.clone(), &["J1"]).await;

    let holder = {
        let d = dispatcher.clone();
        tokio::spawn(async move {
            d.apply_event(&JobId::from("J1"), "tts_completed", &json!({"audioUrl": "a"}))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let waiting = tokio::time::timeout(
        Duration::from_millis(20),
        dispatcher.apply_event(&JobId::from("J1"), "failed", &json!({})),
    )
    .await;
    assert!(waiting.is_err(), "second event should still be queued");

    store.gate.notify_one();
    holder.await.unwrap().unwrap();

    let job = store.get(&JobId::from("J1")).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::VideoRendering);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}
