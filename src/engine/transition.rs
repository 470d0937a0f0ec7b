//! The job state machine: which status an event moves a job to, and which
//! fields it writes on the way.
//!
//! | event              | target             | fields                          |
//! |--------------------|--------------------|---------------------------------|
//! | `script_generated` | `TTS_PROCESSING`   | script, voiceoverText, title    |
//! | `tts_completed`    | `VIDEO_RENDERING`  | audioUrl                        |
//! | `video_rendered`   | `UPLOADING`        | videoUrl                        |
//! | `upload_completed` | `COMPLETED`        | publishedVideoId                |
//! | `failed`           | `FAILED`           | errorMessage                    |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Job, JobStatus, JobUpdate, PipelineEvent};

/// Written to `errorMessage` when a `failed` event carries none.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

/// Whether a transition checks the job's current status first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Apply every recognized event regardless of current status.
    #[default]
    Permissive,
    /// Reject events whose target is not reachable from the current status.
    Strict,
}

impl std::fmt::Display for TransitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionMode::Permissive => f.write_str("permissive"),
            TransitionMode::Strict => f.write_str("strict"),
        }
    }
}

impl std::str::FromStr for TransitionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionMode::Permissive),
            "strict" => Ok(TransitionMode::Strict),
            other => Err(Error::Config(format!(
                "unknown transition mode '{other}' (expected permissive or strict)"
            ))),
        }
    }
}

/// What to do with one event for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Persist this update.
    Apply(JobUpdate),
    /// Unknown event type: no write, acknowledge as-is.
    Acknowledge,
}

/// The status an event moves a job to. `None` for unrecognized events.
pub fn target_status(event: &PipelineEvent) -> Option<JobStatus> {
    match event {
        PipelineEvent::ScriptGenerated { .. } => Some(JobStatus::TtsProcessing),
        PipelineEvent::TtsCompleted { .. } => Some(JobStatus::VideoRendering),
        PipelineEvent::VideoRendered { .. } => Some(JobStatus::Uploading),
        PipelineEvent::UploadCompleted { .. } => Some(JobStatus::Completed),
        PipelineEvent::Failed { .. } => Some(JobStatus::Failed),
        PipelineEvent::Unrecognized(_) => None,
    }
}

/// The stage a job sits in right before it reaches `target`.
fn predecessor(target: JobStatus) -> Option<JobStatus> {
    match target {
        JobStatus::TtsProcessing => Some(JobStatus::ScriptGenerating),
        JobStatus::VideoRendering => Some(JobStatus::TtsProcessing),
        JobStatus::Uploading => Some(JobStatus::VideoRendering),
        JobStatus::Completed => Some(JobStatus::Uploading),
        JobStatus::ScriptGenerating | JobStatus::Failed => None,
    }
}

/// Can `event` be applied to a job currently in `current`?
///
/// Permissive mode accepts everything. Strict mode accepts the expected
/// predecessor, `failed` from any non-terminal status, and redelivery of
/// the event that produced the current status.
pub fn accepts(mode: TransitionMode, current: JobStatus, event: &PipelineEvent) -> bool {
    let Some(target) = target_status(event) else {
        return true;
    };
    match mode {
        TransitionMode::Permissive => true,
        TransitionMode::Strict if current == target => true,
        TransitionMode::Strict => match event {
            PipelineEvent::Failed { .. } => !current.is_terminal(),
            _ => predecessor(target) == Some(current),
        },
    }
}

/// Compute the write for `event` against `job`.
pub fn plan(job: &Job, event: &PipelineEvent, mode: TransitionMode) -> Result<Plan> {
    if !accepts(mode, job.status, event) {
        return Err(Error::InvalidTransition {
            job: job.id.clone(),
            event: event.event_type().to_string(),
            from: job.status,
        });
    }

    Ok(match update_for(event) {
        Some(update) => Plan::Apply(update),
        None => Plan::Acknowledge,
    })
}

fn update_for(event: &PipelineEvent) -> Option<JobUpdate> {
    let mut update = JobUpdate::status(target_status(event)?);
    match event {
        PipelineEvent::ScriptGenerated {
            script,
            voiceover_text,
            title,
        } => {
            update.script = script.clone();
            update.voiceover_text = voiceover_text.clone();
            update.title = title.clone();
        }
        PipelineEvent::TtsCompleted { audio_url } => update.audio_url = audio_url.clone(),
        PipelineEvent::VideoRendered { video_url } => update.video_url = video_url.clone(),
        PipelineEvent::UploadCompleted { published_video_id } => {
            update.published_video_id = published_video_id.clone();
        }
        PipelineEvent::Failed { error_message } => {
            update.error_message = Some(
                error_message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            );
        }
        PipelineEvent::Unrecognized(_) => return None,
    }
    Some(update)
}
