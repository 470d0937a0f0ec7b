//! Orchestration core: state machine, per-job locking, event dispatch.

pub mod dispatcher;
pub mod guard;
pub mod transition;

pub use dispatcher::{Acknowledgement, Dispatcher, TransitionResult};
pub use guard::{JobLockGuard, JobLocks};
pub use transition::{DEFAULT_ERROR_MESSAGE, Plan, TransitionMode};
