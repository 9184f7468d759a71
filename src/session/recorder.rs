use std::sync::Arc;

use log::{error, info};

use super::{SessionApi, SessionRecord};

/// Destination for completed session records. Submission is fire-and-forget:
/// implementations must not block the caller, must not panic, and must make at
/// most one attempt per record. A lost record is logged and forgotten; it is
/// never allowed to disturb timer state.
pub trait SessionSink: Send + Sync {
    fn submit(&self, record: SessionRecord);
}

/// Posts records to the session endpoint on a detached task.
pub struct HttpSessionSink {
    api: Arc<SessionApi>,
}

impl HttpSessionSink {
    pub fn new(api: Arc<SessionApi>) -> Self {
        Self { api }
    }
}

impl SessionSink for HttpSessionSink {
    fn submit(&self, record: SessionRecord) {
        let api = self.api.clone();
        tokio::spawn(async move {
            match api.save_session(&record).await {
                Ok(()) => info!(
                    "saved {}min \"{}\" session for {}",
                    record.duration_minutes, record.category, record.user_id
                ),
                Err(err) => error!("failed to save focus session: {err:#}"),
            }
        });
    }
}
