//! Streaming aggregation engine for comparing several LLMs side by side.
//!
//! One prompt is fanned out to a selection of models; their tokens come back
//! interleaved over a single event stream. The [`Aggregator`] routes each
//! record to per-model state, detects when every selected model has finished,
//! and builds a [`ComparisonReport`] with latency and text statistics.
//!
//! # Usage
//!
//! ```no_run
//! use compare_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CompareError> {
//! let api = ApiClient::from_env()?;
//! let runner = Comparison::new(api);
//!
//! let mut live = runner
//!     .start(
//!         "Explain borrow checking in two sentences.",
//!         SelectionSet::new(["xai.grok-4", "meta.llama-3.3-70b-instruct"]),
//!     )
//!     .await?;
//!
//! while let Some(update) = live.next_update().await {
//!     if let AggregateUpdate::Model(ModelUpdate { model, token: Some(token), .. }) = update {
//!         println!("[{model}] {token}");
//!     }
//! }
//!
//! let report = live.aggregator().outcome()?;
//! if let Some(fastest) = report.fastest_first_token() {
//!     println!("fastest first token: {}", fastest.model);
//! }
//! # Ok(())
//! # }
//! ```

/// Aggregate state for one submission and its completion handling.
pub mod aggregator;
/// Typed client for the prompt, history and model catalog endpoints.
pub mod client;
/// One-shot aggregate completion latch.
pub mod completion;
/// Client configuration and environment loading.
pub mod config;
/// Routing of events to per-model state.
pub mod demux;
/// Public error types.
pub mod errors;
/// Stream record types and decoding.
pub mod event;
/// Model keys, selections and the model catalog.
pub mod model;
/// Process-level logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Final latency comparison.
pub mod report;
/// Submit-then-stream orchestration.
pub mod runner;
/// Per-model response state machine.
pub mod state;
/// Pure text and throughput statistics.
pub mod statistics;
/// Stream subscriptions and cancellation.
pub mod subscription;
/// Stream transport seam and its HTTP implementation.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{
    AggregatePhase, AggregateSnapshot, AggregateUpdate, Aggregator, ModelSnapshot, ModelUpdate,
};
pub use client::{ApiClient, HistoricalResponse, PromptDetail, PromptRecord};
pub use config::ClientConfig;
pub use errors::{CompareError, RecordError, StreamFailure, TransportError};
pub use event::{StreamEvent, StreamRecord};
pub use model::{ModelCatalog, ModelKey, PromptId, SelectionSet};
pub use observability::init_observability;
pub use report::{ComparisonReport, ErroredModel, ModelReport};
pub use runner::{Comparison, LiveComparison};
pub use state::{ModelResponseState, ModelStatus, Transition};
pub use statistics::{DerivedStatistics, calculate_all};
pub use subscription::{CancelHandle, Subscription, SubscriptionManager, SubscriptionNotice};
pub use transport::{HttpStreamTransport, RecordStream, StreamTransport};
