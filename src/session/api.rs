use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::SessionRecord;

/// Error payload the session endpoint may attach to a non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Thin client for the session log endpoint: `POST {base}/sessions` to save,
/// `GET {base}/sessions` for the caller's history newest-first.
pub struct SessionApi {
    client: reqwest::Client,
    base_url: String,
}

impl SessionApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn sessions_url(&self) -> String {
        format!("{}/sessions", self.base_url)
    }

    pub async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let response = self
            .client
            .post(self.sessions_url())
            .json(record)
            .send()
            .await
            .context("session endpoint unreachable")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| "no error detail".to_owned());
        Err(anyhow!("session endpoint returned {status}: {detail}"))
    }

    /// The server scopes the result to the caller's identity and answers an
    /// anonymous caller with an empty list.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let response = self
            .client
            .get(self.sessions_url())
            .send()
            .await
            .context("session endpoint unreachable")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("session endpoint returned {status}"));
        }
        response
            .json::<Vec<SessionRecord>>()
            .await
            .context("malformed session list payload")
    }
}
