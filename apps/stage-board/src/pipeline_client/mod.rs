//! Pipeline client: the board's only way to reach the recruitment service.
//!
//! Every stage, candidate, transition and scheduling call goes through the
//! [`PipelineApi`] trait so board logic can run against the HTTP client in
//! production and an in-memory double in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::candidate::CandidateStage;
use crate::models::stage::Stage;
use crate::models::transition::{ScheduleRequest, TransitionRequest, TransitionResponse};

#[cfg(test)]
pub mod fake;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Reads are retried; writes never are.
const MAX_READ_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Messages from a service error envelope, if the body carried one.
        envelope_messages: Vec<String>,
    },

    #[error("Request rejected: {}", .0.join(", "))]
    Business(Vec<String>),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Response carried no result")]
    MissingResult,
}

impl ApiError {
    /// A message suitable for showing to the user, when the service sent one.
    pub fn user_message(&self) -> Option<String> {
        let messages = match self {
            ApiError::Business(messages) => messages,
            ApiError::Api {
                envelope_messages, ..
            } => envelope_messages,
            _ => return None,
        };
        join_messages(messages)
    }
}

pub(crate) fn join_messages(messages: &[String]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The response wrapper used by every pipeline service endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_success")]
    pub is_success: bool,
    #[serde(default)]
    pub error_messages: Option<Vec<String>>,
    pub result: Option<T>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiEnvelope<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.is_success {
            return Err(ApiError::Business(self.error_messages.unwrap_or_default()));
        }
        self.result.ok_or(ApiError::MissingResult)
    }
}

impl ApiEnvelope<serde_json::Value> {
    /// Error messages for the user. Some endpoints put a single message in
    /// `result` instead of `errorMessages`.
    fn messages(self) -> Vec<String> {
        let messages = self.error_messages.unwrap_or_default();
        if join_messages(&messages).is_some() {
            return messages;
        }
        match self.result {
            Some(serde_json::Value::String(message)) if !message.trim().is_empty() => {
                vec![message]
            }
            _ => messages,
        }
    }
}

/// Filtering and ordering forwarded to the candidate listing endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateQuery {
    pub status: String,
    pub sort_by: String,
    pub descending: bool,
}

/// The recruitment service as seen by the board.
///
/// Carried as `Arc<dyn PipelineApi>` in the board orchestrator and `AppState`.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn get_stages_by_job(&self, job_id: i64) -> Result<Vec<Stage>, ApiError>;

    async fn get_candidates_by_stage(
        &self,
        stage_id: i64,
        query: &CandidateQuery,
    ) -> Result<Vec<CandidateStage>, ApiError>;

    /// Records a pass/fail decision and, when `job_stage_id` is set, moves the
    /// candidate to that stage.
    async fn update_stage_result(
        &self,
        candidate_stage_id: i64,
        request: &TransitionRequest,
    ) -> Result<TransitionResponse, ApiError>;

    async fn update_schedule(
        &self,
        candidate_stage_id: i64,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError>;

    async fn get_candidate_stage(&self, candidate_stage_id: i64)
        -> Result<CandidateStage, ApiError>;
}

/// reqwest implementation of [`PipelineApi`] against the recruitment REST API.
#[derive(Clone)]
pub struct HttpPipelineClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPipelineClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET with retries on transport errors, 429 and 5xx (backoff 500ms, 1s).
    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let url = self.url(path);
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..MAX_READ_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "GET {} attempt {} failed, retrying after {}ms...",
                    url,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .authorize(self.client.get(&url).query(query))
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ApiError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(error_from_response(response).await);
                continue;
            }

            return read_envelope(response).await;
        }

        Err(last_error.unwrap_or(ApiError::Api {
            status: 0,
            message: format!("GET {url} failed after {MAX_READ_ATTEMPTS} attempts"),
            envelope_messages: vec![],
        }))
    }

    async fn put_envelope<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let response = self
            .authorize(self.client.put(self.url(path)).json(body))
            .send()
            .await?;
        read_envelope(response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>, ApiError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!("Pipeline API returned {}: {}", status, body);
    api_error(status, &body)
}

/// Builds an [`ApiError::Api`], lifting messages out of an error envelope.
pub(crate) fn api_error(status: u16, body: &str) -> ApiError {
    let envelope_messages = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .map(ApiEnvelope::messages)
        .unwrap_or_default();
    let message = join_messages(&envelope_messages).unwrap_or_else(|| body.to_string());
    ApiError::Api {
        status,
        message,
        envelope_messages,
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineClient {
    async fn get_stages_by_job(&self, job_id: i64) -> Result<Vec<Stage>, ApiError> {
        let stages: Vec<Stage> = self
            .get_envelope(&format!("JobStage/by-job/{job_id}"), &[])
            .await?
            .into_result()?;
        debug!("Fetched {} stages for job {}", stages.len(), job_id);
        Ok(stages)
    }

    async fn get_candidates_by_stage(
        &self,
        stage_id: i64,
        query: &CandidateQuery,
    ) -> Result<Vec<CandidateStage>, ApiError> {
        let params = [
            ("status", query.status.clone()),
            ("sortBy", query.sort_by.clone()),
            ("isDescending", query.descending.to_string()),
        ];
        let candidates: Vec<CandidateStage> = self
            .get_envelope(&format!("CandidateStage/jobStage/{stage_id}"), &params)
            .await?
            .into_result()?;
        debug!("Fetched {} candidates for stage {}", candidates.len(), stage_id);
        Ok(candidates)
    }

    async fn update_stage_result(
        &self,
        candidate_stage_id: i64,
        request: &TransitionRequest,
    ) -> Result<TransitionResponse, ApiError> {
        let envelope: ApiEnvelope<CandidateStage> = self
            .put_envelope(&format!("CandidateStage/{candidate_stage_id}/result"), request)
            .await?;
        Ok(TransitionResponse {
            is_success: envelope.is_success,
            error_messages: envelope.error_messages.unwrap_or_default(),
            candidate: envelope.result,
        })
    }

    async fn update_schedule(
        &self,
        candidate_stage_id: i64,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .put_envelope(&format!("CandidateStage/{candidate_stage_id}/schedule"), request)
            .await?;
        if !envelope.is_success {
            return Err(ApiError::Business(envelope.messages()));
        }
        Ok(())
    }

    async fn get_candidate_stage(
        &self,
        candidate_stage_id: i64,
    ) -> Result<CandidateStage, ApiError> {
        self.get_envelope(&format!("CandidateStage/{candidate_stage_id}"), &[])
            .await?
            .into_result()
    }
}
