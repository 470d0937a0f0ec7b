//! Jobs and their pipeline status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A content job tracked through the pipeline.
///
/// Payload fields are written by exactly one stage each and are never
/// cleared once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,

    pub script: Option<String>,
    pub voiceover_text: Option<String>,
    pub title: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub published_video_id: Option<String>,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh job at the start of the pipeline.
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::ScriptGenerating,
            script: None,
            voiceover_text: None,
            title: None,
            audio_url: None,
            video_url: None,
            published_video_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into this record. Absent fields keep their value.
    pub fn apply(&mut self, update: &JobUpdate) {
        fn merge(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        self.status = update.status;
        merge(&mut self.script, &update.script);
        merge(&mut self.voiceover_text, &update.voiceover_text);
        merge(&mut self.title, &update.title);
        merge(&mut self.audio_url, &update.audio_url);
        merge(&mut self.video_url, &update.video_url);
        merge(&mut self.published_video_id, &update.published_video_id);
        merge(&mut self.error_message, &update.error_message);
        self.updated_at = Utc::now();
    }
}

/// Opaque job identifier. Assigned by whoever creates the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// A new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Pipeline status of a job.
///
/// Progress runs `ScriptGenerating → TtsProcessing → VideoRendering →
/// Uploading → Completed`. `Failed` is reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    ScriptGenerating,
    TtsProcessing,
    VideoRendering,
    Uploading,
    Completed,
    Failed,
}

impl JobStatus {
    /// No further transition is expected once a job is here.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::ScriptGenerating => "SCRIPT_GENERATING",
            JobStatus::TtsProcessing => "TTS_PROCESSING",
            JobStatus::VideoRendering => "VIDEO_RENDERING",
            JobStatus::Uploading => "UPLOADING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCRIPT_GENERATING" => Ok(JobStatus::ScriptGenerating),
            "TTS_PROCESSING" => Ok(JobStatus::TtsProcessing),
            "VIDEO_RENDERING" => Ok(JobStatus::VideoRendering),
            "UPLOADING" => Ok(JobStatus::Uploading),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(Error::Other(format!("unknown job status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// A partial write: the new status plus whichever payload fields the
/// transition produced. `None` means "leave as is", never "clear".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobUpdate {
    /// An update that only sets the status.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status,
            script: None,
            voiceover_text: None,
            title: None,
            audio_url: None,
            video_url: None,
            published_video_id: None,
            error_message: None,
        }
    }

    /// Names of the payload fields this update writes, in wire spelling.
    pub fn written_fields(&self) -> Vec<&'static str> {
        [
            ("script", self.script.is_some()),
            ("voiceoverText", self.voiceover_text.is_some()),
            ("title", self.title.is_some()),
            ("audioUrl", self.audio_url.is_some()),
            ("videoUrl", self.video_url.is_some()),
            ("publishedVideoId", self.published_video_id.is_some()),
            ("errorMessage", self.error_message.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}
