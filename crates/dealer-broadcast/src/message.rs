use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle stage reported by a long-running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Progress/status update published on a broadcast channel as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BroadcastMessage {
    #[validate(length(min = 1, message = "process_id must not be empty"))]
    pub process_id: String,
    pub status: ProcessStatus,
    #[validate(range(min = 0, max = 100, message = "progress must be between 0 and 100"))]
    pub progress: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub sent_at: DateTime<Utc>,
}

impl BroadcastMessage {
    pub fn new(process_id: impl Into<String>, status: ProcessStatus, progress: i32) -> Self {
        Self {
            process_id: process_id.into(),
            status,
            progress,
            message: None,
            data: None,
            sent_at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
