use std::pin::Pin;

use eventsource_stream::{Event, Eventsource as _};
use futures::StreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{CompareError, TransportError};
use crate::model::{PromptId, SelectionSet};

use super::{RecordStream, StreamTransport};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// `StreamTransport` over `GET /api/prompts/{id}/stream` (server-sent events).
pub struct HttpStreamTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpStreamTransport {
    /// Creates a transport from explicit client configuration.
    pub fn new(config: ClientConfig) -> Result<Self, CompareError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CompareError::Config(format!("failed to build stream client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Reuses an existing client (shared connection pool with `ApiClient`).
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

/// Stream URL with one `models=` pair per selected key.
pub(crate) fn stream_url(
    config: &ClientConfig,
    prompt_id: PromptId,
    models: &SelectionSet,
) -> Result<reqwest::Url, TransportError> {
    let mut url = reqwest::Url::parse(&config.api_url(&format!("prompts/{prompt_id}/stream")))
        .map_err(|e| TransportError::request(format!("invalid stream url: {e}")))?;
    if !models.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for key in models.iter() {
            pairs.append_pair("models", key.as_str());
        }
    }
    Ok(url)
}

#[async_trait::async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn connect(
        &self,
        prompt_id: PromptId,
        models: &SelectionSet,
    ) -> Result<RecordStream, TransportError> {
        let url = stream_url(&self.config, prompt_id, models)?;
        debug!(prompt_id = %prompt_id, url = %url, "opening event stream");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::request(format!("stream request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::status(status.as_u16(), body));
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(sse_payload_stream(bytes_stream)))
    }
}

/// Non-blank `data` of one event. Named events are accepted like `message`.
fn event_payload(event: Event) -> Option<String> {
    if event.event != "message" {
        debug!(event = %event.event, "named event frame");
    }
    let data = event.data.trim();
    if data.is_empty() {
        return None;
    }
    Some(data.to_string())
}

fn sse_payload_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<String, TransportError>> + Send {
    bytes_stream.eventsource().filter_map(|item| async move {
        match item {
            Ok(event) => event_payload(event).map(Ok),
            Err(e) => Some(Err(TransportError::read(format!(
                "event stream read failed: {e}"
            )))),
        }
    })
}
