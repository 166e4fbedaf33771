use std::sync::Arc;

use tracing::info;

use crate::aggregator::{AggregateSnapshot, AggregateUpdate, Aggregator};
use crate::client::{ApiClient, PromptRecord};
use crate::errors::CompareError;
use crate::model::SelectionSet;
use crate::report::ComparisonReport;
use crate::subscription::{CancelHandle, Subscription, SubscriptionManager};

/// Submits prompts and opens their comparison streams.
#[derive(Clone)]
pub struct Comparison {
    api: ApiClient,
    subscriptions: SubscriptionManager,
}

impl Comparison {
    /// Streams over HTTP, sharing `api`'s connection pool.
    pub fn new(api: ApiClient) -> Self {
        let transport = Arc::new(api.stream_transport());
        let subscriptions = SubscriptionManager::new(transport)
            .buffer_capacity(api.config().stream_buffer_capacity);
        Self { api, subscriptions }
    }

    /// Replaces the subscription manager (custom transport or buffer size).
    pub fn with_subscriptions(mut self, subscriptions: SubscriptionManager) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Validates input, submits the prompt and opens its stream.
    ///
    /// Validation happens before any network call. A failed submission
    /// leaves nothing open.
    pub async fn start(
        &self,
        prompt_text: &str,
        selection: SelectionSet,
    ) -> Result<LiveComparison, CompareError> {
        if selection.is_empty() {
            return Err(CompareError::Validation(
                "Please select at least one model to compare.".into(),
            ));
        }
        if prompt_text.trim().is_empty() {
            return Err(CompareError::Validation("prompt text is empty".into()));
        }

        let prompt = self.api.submit_prompt(prompt_text).await?;
        info!(prompt_id = %prompt.id, models = selection.len(), "prompt submitted");
        let subscription = self.subscriptions.open(prompt.id, &selection)?;
        let mut aggregator = Aggregator::new(prompt.id, selection);
        aggregator.attach(subscription.cancel_handle());

        Ok(LiveComparison {
            prompt,
            aggregator,
            subscription,
        })
    }
}

/// One submitted prompt with its open stream.
pub struct LiveComparison {
    prompt: PromptRecord,
    aggregator: Aggregator,
    subscription: Subscription,
}

impl LiveComparison {
    pub fn prompt(&self) -> &PromptRecord {
        &self.prompt
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Handle to stop the stream from another task (e.g. on Ctrl-C).
    pub fn cancel_handle(&self) -> CancelHandle {
        self.subscription.cancel_handle()
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        self.aggregator.snapshot()
    }

    /// Next aggregation step; `None` once the comparison has stopped.
    pub async fn next_update(&mut self) -> Option<AggregateUpdate> {
        self.aggregator.next_update(&mut self.subscription).await
    }

    /// Drains the stream and returns the final report.
    pub async fn finish(mut self) -> Result<ComparisonReport, CompareError> {
        self.aggregator
            .run_to_completion(&mut self.subscription)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::errors::{StreamFailure, TransportError};
    use crate::model::{ModelKey, PromptId};
    use crate::testing::{FakeBehavior, FakeTransport};
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn comparison(base_url: &str, transport: Arc<FakeTransport>) -> Comparison {
        let api = ApiClient::new(ClientConfig::new(base_url)).expect("client");
        Comparison::new(api).with_subscriptions(SubscriptionManager::new(transport))
    }

    async fn mount_submission(server: &MockServer, id: i64) {
        Mock::given(method("POST"))
            .and(path("/api/prompts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": id,
                "text": "hello",
                "created_at": "2025-03-01T10:20:30"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn rejects_empty_selection_and_blank_prompt_without_network() {
        let transport = Arc::new(FakeTransport::new(FakeBehavior::Pending));
        let runner = comparison("http://127.0.0.1:1", transport.clone());

        let empty = runner.start("hello", SelectionSet::default()).await;
        assert!(matches!(
            empty,
            Err(CompareError::Validation(ref m))
                if m == "Please select at least one model to compare."
        ));

        let blank = runner.start("   ", SelectionSet::new(["a"])).await;
        assert!(matches!(blank, Err(CompareError::Validation(_))));
        assert_eq!(transport.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_submission_opens_no_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/prompts"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        let transport = Arc::new(FakeTransport::new(FakeBehavior::Pending));
        let runner = comparison(&server.uri(), transport.clone());

        let result = runner.start("hello", SelectionSet::new(["a"])).await;
        assert!(matches!(
            result,
            Err(CompareError::Submission(TransportError::Status { status: 503, .. }))
        ));
        assert_eq!(transport.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_submission_failure() {
        let transport = Arc::new(FakeTransport::new(FakeBehavior::Pending));
        let runner = comparison("http://127.0.0.1:1", transport.clone());

        let result = runner.start("hello", SelectionSet::new(["a"])).await;
        assert!(matches!(result, Err(CompareError::Submission(_))));
        assert_eq!(transport.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submits_streams_and_reports_over_http() {
        let server = MockServer::start().await;
        mount_submission(&server, 7).await;
        let body = [
            r#"{"model_name":"a","token":"Hello","time_to_first_token":0.3,"total_time":0.3}"#,
            r#"{"model_name":"b","token":"Hi","time_to_first_token":0.1,"total_time":0.1}"#,
            r#"{"model_name":"a","token":" world.","time_to_first_token":0.9,"total_time":0.9}"#,
            r#"{"model_name":"b","is_complete":true,"error":"rate limited"}"#,
            r#"{"model_name":"a","is_complete":true,"time_to_first_token":0.35,"total_time":2.0}"#,
        ]
        .iter()
        .map(|record| format!("data: {record}\n\n"))
        .collect::<String>();
        Mock::given(method("GET"))
            .and(path("/api/prompts/7/stream"))
            .and(query_param("models", "a"))
            .and(query_param("models", "b"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let api = ApiClient::new(ClientConfig::new(server.uri())).expect("client");
        let live = Comparison::new(api)
            .start("hello", SelectionSet::new(["a", "b"]))
            .await
            .expect("start");
        assert_eq!(live.prompt().id, PromptId(7));
        let report = live.finish().await.expect("report");

        let a = report.get(&ModelKey::new("a")).expect("a finished");
        assert_eq!(a.time_to_first_token_ms, Some(350.0));
        assert_eq!(a.total_time_ms, Some(2000.0));
        assert_eq!(a.response_length, "Hello world.".len());
        assert_eq!(a.statistics.word_count, 2);
        assert_eq!(report.errored.len(), 1);
        assert_eq!(report.errored[0].error, "rate limited");
    }

    #[tokio::test]
    async fn stream_status_error_fails_the_comparison() {
        let server = MockServer::start().await;
        mount_submission(&server, 8).await;
        Mock::given(method("GET"))
            .and(path("/api/prompts/8/stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("stream broke"))
            .mount(&server)
            .await;

        let api = ApiClient::new(ClientConfig::new(server.uri())).expect("client");
        let live = Comparison::new(api)
            .start("hello", SelectionSet::new(["a"]))
            .await
            .expect("start");
        let result = live.finish().await;
        assert!(matches!(
            result,
            Err(CompareError::Stream(StreamFailure::Transport { ref message }))
                if message.contains("500")
        ));
    }
}
