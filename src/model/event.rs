//! Inbound stage notifications.
//!
//! Stages post a loosely typed envelope. The dispatcher turns it into a
//! [`PipelineEvent`], one variant per known event type, so the transition
//! table can be matched exhaustively. Unknown types are kept, not rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::JobId;

/// Wire shape of a webhook call from a pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Event type tag, e.g. `"tts_completed"`.
    pub event: String,
    pub content_job_id: String,
    #[serde(default)]
    pub data: Value,
    /// Advisory only. Never used for ordering.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WebhookEvent {
    pub fn job_id(&self) -> JobId {
        JobId(self.content_job_id.clone())
    }

    pub fn parse(&self) -> PipelineEvent {
        PipelineEvent::parse(&self.event, &self.data)
    }
}

/// A stage notification with its type-specific payload.
///
/// Every payload field is optional: stages may send partial data and a
/// missing field is never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    ScriptGenerated {
        script: Option<String>,
        voiceover_text: Option<String>,
        title: Option<String>,
    },
    TtsCompleted {
        audio_url: Option<String>,
    },
    VideoRendered {
        video_url: Option<String>,
    },
    UploadCompleted {
        published_video_id: Option<String>,
    },
    Failed {
        error_message: Option<String>,
    },
    /// An event type this deployment does not know about.
    Unrecognized(String),
}

pub const SCRIPT_GENERATED: &str = "script_generated";
pub const TTS_COMPLETED: &str = "tts_completed";
pub const VIDEO_RENDERED: &str = "video_rendered";
pub const UPLOAD_COMPLETED: &str = "upload_completed";
pub const FAILED: &str = "failed";

impl PipelineEvent {
    /// Parse an event type and its data bag.
    ///
    /// Non-object `data`, missing keys and non-string values all read as
    /// absent fields.
    pub fn parse(event_type: &str, data: &Value) -> Self {
        match event_type {
            SCRIPT_GENERATED => PipelineEvent::ScriptGenerated {
                script: text(data, "script"),
                voiceover_text: text(data, "voiceoverText"),
                title: text(data, "title"),
            },
            TTS_COMPLETED => PipelineEvent::TtsCompleted {
                audio_url: text(data, "audioUrl"),
            },
            VIDEO_RENDERED => PipelineEvent::VideoRendered {
                video_url: text(data, "videoUrl"),
            },
            UPLOAD_COMPLETED => PipelineEvent::UploadCompleted {
                published_video_id: text(data, "publishedVideoId"),
            },
            FAILED => PipelineEvent::Failed {
                error_message: text(data, "errorMessage"),
            },
            other => PipelineEvent::Unrecognized(other.to_string()),
        }
    }

    /// The type tag this event arrived with.
    pub fn event_type(&self) -> &str {
        match self {
            PipelineEvent::ScriptGenerated { .. } => SCRIPT_GENERATED,
            PipelineEvent::TtsCompleted { .. } => TTS_COMPLETED,
            PipelineEvent::VideoRendered { .. } => VIDEO_RENDERED,
            PipelineEvent::UploadCompleted { .. } => UPLOAD_COMPLETED,
            PipelineEvent::Failed { .. } => FAILED,
            PipelineEvent::Unrecognized(tag) => tag,
        }
    }
}

fn text(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}
