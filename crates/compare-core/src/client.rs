use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{CompareError, TransportError};
use crate::model::{ModelCatalog, ModelKey, PromptId, SelectionSet};
use crate::statistics::{DerivedStatistics, calculate_all};
use crate::transport::{HttpStreamTransport, stream_url};

/// A stored prompt as returned by `POST /api/prompts` and `GET /api/prompts`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PromptRecord {
    pub id: PromptId,
    pub text: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One model's stored answer in a historical prompt.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoricalResponse {
    pub model_name: ModelKey,
    pub response_text: String,
    pub time_to_first_token: f64,
    pub total_time: f64,
}

impl HistoricalResponse {
    pub fn statistics(&self) -> DerivedStatistics {
        calculate_all(&self.response_text, self.total_time)
    }
}

/// `GET /api/prompts/{id}` payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PromptDetail {
    #[serde(default)]
    pub id: Option<PromptId>,
    pub text: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub model_responses: Vec<HistoricalResponse>,
}

/// Accepts RFC 3339 or a naive ISO-8601 timestamp (taken as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

/// Typed client for the comparison API's JSON endpoints.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, CompareError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CompareError::Config(format!("failed to build api client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Builds a client from `COMPARE_*` environment variables.
    pub fn from_env() -> Result<Self, CompareError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stream transport sharing this client's connection pool.
    pub fn stream_transport(&self) -> HttpStreamTransport {
        HttpStreamTransport::with_client(self.client.clone(), self.config.clone())
    }

    /// Stream endpoint URL for a prompt and model selection.
    pub fn stream_url(
        &self,
        prompt_id: PromptId,
        models: &SelectionSet,
    ) -> Result<reqwest::Url, CompareError> {
        stream_url(&self.config, prompt_id, models).map_err(CompareError::Api)
    }

    /// `POST /api/prompts`. Any failure maps to `CompareError::Submission`.
    pub async fn submit_prompt(&self, text: &str) -> Result<PromptRecord, CompareError> {
        debug!(chars = text.chars().count(), "submitting prompt");
        let request = self
            .client
            .post(self.config.api_url("prompts"))
            .timeout(self.config.request_timeout)
            .json(&serde_json::json!({ "text": text }));
        send_json(request).await.map_err(CompareError::Submission)
    }

    /// `GET /api/prompts`.
    pub async fn list_prompts(&self) -> Result<Vec<PromptRecord>, CompareError> {
        let request = self
            .client
            .get(self.config.api_url("prompts"))
            .timeout(self.config.request_timeout);
        send_json(request).await.map_err(CompareError::Api)
    }

    /// `GET /api/prompts/{id}`; a 404 becomes `PromptNotFound`.
    pub async fn prompt_detail(&self, id: PromptId) -> Result<PromptDetail, CompareError> {
        let request = self
            .client
            .get(self.config.api_url(&format!("prompts/{id}")))
            .timeout(self.config.request_timeout);
        send_json(request).await.map_err(|err| match err.status_code() {
            Some(404) => CompareError::PromptNotFound(id),
            _ => CompareError::Api(err),
        })
    }

    /// `GET /api/models`.
    pub async fn list_models(&self) -> Result<ModelCatalog, CompareError> {
        let request = self
            .client
            .get(self.config.api_url("models"))
            .timeout(self.config.request_timeout);
        send_json(request).await.map_err(CompareError::Api)
    }
}

async fn send_json<T>(request: reqwest::RequestBuilder) -> Result<T, TransportError>
where
    T: serde::de::DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|e| TransportError::request(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(TransportError::status(status.as_u16(), body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::read(format!("invalid response body: {e}")))
}
