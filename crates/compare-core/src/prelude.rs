//! Common imports for typical comparison usage.
pub use crate::{
    AggregateUpdate, Aggregator, ApiClient, CancelHandle, ClientConfig, CompareError, Comparison,
    ComparisonReport, DerivedStatistics, LiveComparison, ModelKey, ModelStatus, ModelUpdate,
    PromptId, SelectionSet, StreamEvent, StreamFailure,
};
