use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerMode;

/// One logged unit of focused work, in the shape the session endpoint speaks:
/// `{user_id, category, duration, start_time}` with the duration in whole
/// minutes and the start time as an ISO-8601 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Assigned by the backend; absent until the record has been saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub category: String,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub start_time: DateTime<Utc>,
}

/// Completion data produced by the engine before an identity is attached.
/// Becomes a [`SessionRecord`] only if a signed-in user is available at the
/// moment the run finishes or is stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub mode: TimerMode,
    pub category: String,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
}

impl SessionDraft {
    pub fn into_record(self, user_id: String) -> SessionRecord {
        SessionRecord {
            id: None,
            user_id,
            category: self.category,
            duration_minutes: self.duration_minutes,
            start_time: self.started_at,
        }
    }
}
