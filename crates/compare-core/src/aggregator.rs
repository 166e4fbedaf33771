//! Composition root for one submission.
//!
//! The [`Aggregator`] owns all per-model state. Records enter through
//! [`Aggregator::apply_record`] (or [`Aggregator::next_update`], which pulls
//! from a [`Subscription`]); callers only ever see owned snapshots.

use tracing::{debug, error, info, warn};

use crate::completion::CompletionDetector;
use crate::demux::{Dispatch, StreamDemultiplexer};
use crate::errors::{CompareError, RecordError, StreamFailure};
use crate::event::{StreamEvent, StreamRecord};
use crate::model::{ModelKey, PromptId, SelectionSet};
use crate::report::ComparisonReport;
use crate::state::{ModelResponseState, Transition};
use crate::statistics::DerivedStatistics;
use crate::subscription::{CancelHandle, Subscription, SubscriptionNotice};

/// Where the submission stands.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregatePhase {
    Streaming,
    /// Every selected model is terminal; state is frozen.
    Completed,
    Failed(StreamFailure),
    Cancelled,
}

/// Result of applying one event to a model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelUpdate {
    pub model: ModelKey,
    pub transition: Transition,
    /// Token appended by this event, if any.
    pub token: Option<String>,
    pub unrequested: bool,
    /// True on the single event that completed the whole selection.
    pub completed_all: bool,
}

/// One step of aggregation, as seen by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateUpdate {
    Model(ModelUpdate),
    /// Record could not be parsed and was dropped; streaming continues.
    Dropped(RecordError),
    /// Event arrived after the state was frozen.
    Ignored,
    Failed(StreamFailure),
    Cancelled,
}

/// Read-only copy of one model's state.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ModelSnapshot {
    pub model: ModelKey,
    pub requested: bool,
    pub state: ModelResponseState,
}

/// Read-only copy of the whole aggregate.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AggregateSnapshot {
    pub prompt_id: PromptId,
    /// Selected models in selection order, then unrequested models in
    /// first-seen order.
    pub models: Vec<ModelSnapshot>,
    pub all_done: bool,
}

impl AggregateSnapshot {
    pub fn get(&self, model: &ModelKey) -> Option<&ModelSnapshot> {
        self.models.iter().find(|m| &m.model == model)
    }
}

/// Aggregates one submission's stream. Build a fresh one per submission.
pub struct Aggregator {
    prompt_id: PromptId,
    selection: SelectionSet,
    demux: StreamDemultiplexer,
    detector: CompletionDetector,
    phase: AggregatePhase,
    cancel: Option<CancelHandle>,
    report: Option<ComparisonReport>,
    dropped_records: usize,
}

impl Aggregator {
    pub fn new(prompt_id: PromptId, selection: SelectionSet) -> Self {
        Self {
            prompt_id,
            selection,
            demux: StreamDemultiplexer::new(),
            detector: CompletionDetector::new(),
            phase: AggregatePhase::Streaming,
            cancel: None,
            report: None,
            dropped_records: 0,
        }
    }

    /// Registers the subscription to cancel on completion or failure.
    pub fn attach(&mut self, cancel: CancelHandle) {
        self.cancel = Some(cancel);
    }

    pub fn prompt_id(&self) -> PromptId {
        self.prompt_id
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn phase(&self) -> &AggregatePhase {
        &self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == AggregatePhase::Streaming
    }

    pub fn all_done(&self) -> bool {
        self.detector.has_fired()
    }

    pub fn dropped_records(&self) -> usize {
        self.dropped_records
    }

    /// Final report; present only after aggregate completion.
    pub fn report(&self) -> Option<&ComparisonReport> {
        self.report.as_ref()
    }

    pub fn statistics(&self, model: &ModelKey) -> Option<&DerivedStatistics> {
        self.report.as_ref()?.get(model).map(|r| &r.statistics)
    }

    /// Decodes and applies one raw record payload.
    pub fn apply_record(&mut self, raw: &str) -> AggregateUpdate {
        match StreamRecord::decode(raw) {
            Ok(StreamRecord::Model(event)) => self.apply_event(&event),
            Ok(StreamRecord::StreamError { message }) => {
                self.fail(StreamFailure::Server { message });
                match &self.phase {
                    AggregatePhase::Failed(failure) => AggregateUpdate::Failed(failure.clone()),
                    _ => AggregateUpdate::Ignored,
                }
            }
            Err(err) => {
                self.dropped_records += 1;
                warn!(prompt_id = %self.prompt_id, error = %err, "dropping malformed record");
                AggregateUpdate::Dropped(err)
            }
        }
    }

    /// Applies one decoded event. This is the only path that mutates model state.
    pub fn apply_event(&mut self, event: &StreamEvent) -> AggregateUpdate {
        if !self.is_streaming() {
            debug!(
                prompt_id = %self.prompt_id,
                model = %event.model_key,
                "event after aggregation stopped; ignored"
            );
            return AggregateUpdate::Ignored;
        }

        let Dispatch {
            model,
            transition,
            unrequested,
            created,
        } = self.demux.dispatch(event, &self.selection);
        if created {
            debug!(prompt_id = %self.prompt_id, model = %model, "first event from model");
        }
        let token = match transition {
            Transition::Ignored => None,
            _ => event.token_text().map(ToOwned::to_owned),
        };
        if let Some(token) = &token {
            debug!(prompt_id = %self.prompt_id, model = %model, len = token.len(), "token applied");
        }
        if let Transition::Terminated(status) = transition {
            info!(prompt_id = %self.prompt_id, model = %model, ?status, "model finished");
        }

        let completed_all =
            transition.changed() && self.detector.evaluate(&self.selection, &self.demux);
        if completed_all {
            self.complete();
        }

        AggregateUpdate::Model(ModelUpdate {
            model,
            transition,
            token,
            unrequested,
            completed_all,
        })
    }

    /// Records a stream-level failure. No-op unless still streaming.
    pub fn fail(&mut self, failure: StreamFailure) {
        if !self.is_streaming() {
            return;
        }
        error!(prompt_id = %self.prompt_id, error = %failure, "stream failed");
        self.phase = AggregatePhase::Failed(failure);
        self.release();
    }

    /// Marks the submission cancelled by the caller. No-op unless still streaming.
    pub fn cancel(&mut self) {
        if !self.is_streaming() {
            return;
        }
        info!(prompt_id = %self.prompt_id, "aggregation cancelled");
        self.phase = AggregatePhase::Cancelled;
        self.release();
    }

    fn complete(&mut self) {
        self.phase = AggregatePhase::Completed;
        self.release();
        let snapshot = self.snapshot();
        let report = ComparisonReport::build(self.prompt_id, &snapshot.models);
        info!(
            prompt_id = %self.prompt_id,
            finished = report.finished.len(),
            errored = report.errored.len(),
            "all selected models finished"
        );
        self.report = Some(report);
    }

    fn release(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    /// Owned copy of the current state.
    ///
    /// Selected models that have not produced an event yet appear as `Pending`.
    pub fn snapshot(&self) -> AggregateSnapshot {
        let mut models: Vec<ModelSnapshot> = self
            .selection
            .iter()
            .map(|key| ModelSnapshot {
                model: key.clone(),
                requested: true,
                state: self.demux.get(key).cloned().unwrap_or_default(),
            })
            .collect();
        models.extend(
            self.demux
                .iter()
                .filter(|(key, _)| !self.selection.contains(key))
                .map(|(key, state)| ModelSnapshot {
                    model: key.clone(),
                    requested: false,
                    state: state.clone(),
                }),
        );
        AggregateSnapshot {
            prompt_id: self.prompt_id,
            models,
            all_done: self.all_done(),
        }
    }

    /// Pulls the next notice from `subscription` and applies it.
    ///
    /// Returns `None` once aggregation has stopped (completed, failed or
    /// cancelled).
    pub async fn next_update(
        &mut self,
        subscription: &mut Subscription,
    ) -> Option<AggregateUpdate> {
        if !self.is_streaming() {
            return None;
        }
        if self.cancel.is_none() {
            self.attach(subscription.cancel_handle());
        }
        let update = match subscription.next_notice().await {
            Some(SubscriptionNotice::Record(raw)) => self.apply_record(&raw),
            Some(SubscriptionNotice::Failed(failure)) => {
                self.fail(failure.clone());
                AggregateUpdate::Failed(failure)
            }
            Some(SubscriptionNotice::Ended) | None => {
                self.fail(StreamFailure::EndedEarly);
                AggregateUpdate::Failed(StreamFailure::EndedEarly)
            }
            Some(SubscriptionNotice::Cancelled) => {
                self.cancel();
                AggregateUpdate::Cancelled
            }
        };
        Some(update)
    }

    /// Drives `subscription` until aggregation stops and returns the report.
    pub async fn run_to_completion(
        &mut self,
        subscription: &mut Subscription,
    ) -> Result<ComparisonReport, CompareError> {
        while self.next_update(subscription).await.is_some() {}
        self.outcome()
    }

    /// Report on completion, otherwise the reason aggregation stopped.
    pub fn outcome(&self) -> Result<ComparisonReport, CompareError> {
        match &self.phase {
            AggregatePhase::Completed => self
                .report
                .clone()
                .ok_or_else(|| CompareError::Validation("completed without a report".into())),
            AggregatePhase::Failed(failure) => Err(CompareError::Stream(failure.clone())),
            AggregatePhase::Cancelled => Err(CompareError::Cancelled),
            AggregatePhase::Streaming => Err(CompareError::Validation(
                "aggregation is still streaming".into(),
            )),
        }
    }
}
