//! HTTP client for the quiz progress API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use levelup_core::model::{ProgressSnapshot, QuizResult};

use crate::backend::RemoteProgressApi;
use crate::error::{StoreError, StoreResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Progress API over HTTP with bearer-token authentication.
pub struct HttpProgressApi {
    base_url: String,
    token: Option<String>,
    timeout_ms: u64,
    client: reqwest::Client,
}

/// Response wrapper used by every endpoint.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpProgressApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout_ms: timeout.as_millis() as u64,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn progress_url(&self, quiz_id: &str) -> String {
        format!("{}/quizzes/{}/progress", self.base_url, quiz_id)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout_ms)
        } else {
            StoreError::Network(e.to_string())
        }
    }

    /// Map error statuses and decode the envelope of a successful response.
    async fn read_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> StoreResult<Envelope<T>> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.send_error(e))?;

        if status == 401 || status == 403 {
            return Err(StoreError::Unauthorized(body));
        }
        if status >= 400 {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(StoreError::Api { status, message });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<B: Serialize + Sync>(&self, url: String, body: &B) -> StoreResult<()> {
        let response = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let envelope: Envelope<serde_json::Value> = self.read_envelope(response).await?;
        if !envelope.success {
            return Err(StoreError::Rejected(
                envelope.message.unwrap_or_else(|| "no reason given".into()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteProgressApi for HttpProgressApi {
    #[instrument(skip(self))]
    async fn fetch_progress(&self, quiz_id: &str) -> StoreResult<Option<ProgressSnapshot>> {
        let response = self
            .authorized(self.client.get(self.progress_url(quiz_id)))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let envelope: Envelope<ProgressSnapshot> = self.read_envelope(response).await?;
        if !envelope.success {
            tracing::debug!(
                message = envelope.message.as_deref().unwrap_or(""),
                "API reported no progress"
            );
            return Ok(None);
        }
        Ok(envelope.data)
    }

    #[instrument(skip(self, snapshot), fields(answered = snapshot.questions_answered))]
    async fn store_progress(&self, quiz_id: &str, snapshot: &ProgressSnapshot) -> StoreResult<()> {
        self.post_json(self.progress_url(quiz_id), snapshot).await
    }

    #[instrument(skip(self, result), fields(quiz = %result.quiz_name, score = result.score))]
    async fn submit_result(&self, result: &QuizResult) -> StoreResult<()> {
        self.post_json(format!("{}/users/quiz-results", self.base_url), result)
            .await
    }
}
