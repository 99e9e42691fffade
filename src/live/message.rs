use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::JobStatus;

/// One push-channel frame, keyed by its `type` field.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveMessage {
    PipelineRefresh,
    StatusUpdate {
        job_id: Option<String>,
        status: Option<JobStatus>,
    },
    LogLine {
        job_id: String,
        line: String,
    },
    /// Any other well-formed JSON frame, forwarded untouched.
    Other(Value),
}

impl LiveMessage {
    /// Whether the message invalidates the pipeline snapshot.
    pub fn wants_refresh(&self) -> bool {
        matches!(self, Self::PipelineRefresh | Self::StatusUpdate { .. })
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::PipelineRefresh => "pipeline_refresh",
            Self::StatusUpdate { .. } => "status_update",
            Self::LogLine { .. } => "log_line",
            Self::Other(value) => value.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }
}

#[derive(Deserialize)]
struct StatusFields {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Deserialize)]
struct LogFields {
    job_id: String,
    line: String,
}

/// Parse a text frame. Returns `None` for anything that is not JSON; such
/// frames are dropped without touching connection state.
pub fn parse_frame(text: &str) -> Option<LiveMessage> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(%error, "dropping malformed live frame");
            return None;
        }
    };

    let message = match value.get("type").and_then(Value::as_str) {
        Some("pipeline_refresh") => LiveMessage::PipelineRefresh,
        Some("status_update") => match StatusFields::deserialize(&value) {
            Ok(fields) => LiveMessage::StatusUpdate {
                job_id: fields.job_id,
                status: fields.status,
            },
            Err(_) => LiveMessage::StatusUpdate {
                job_id: None,
                status: None,
            },
        },
        Some("log_line") => match LogFields::deserialize(&value) {
            Ok(fields) => LiveMessage::LogLine {
                job_id: fields.job_id,
                line: fields.line,
            },
            Err(_) => LiveMessage::Other(value),
        },
        _ => LiveMessage::Other(value),
    };

    Some(message)
}
