//! # jobflow
//!
//! Job-status orchestration for a staged content pipeline (script → speech
//! → render → upload). External stages report progress through webhooks;
//! jobflow advances each job's persisted status safely under duplicate,
//! out-of-order and concurrent delivery.
//!
//! Admission (`api`) → dispatch (`engine::dispatcher`) → per-job lock
//! (`engine::guard`) → state machine (`engine::transition`) → job store
//! (`store`, `db`).

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;
pub mod telemetry;
