use crate::aggregator::ModelSnapshot;
use crate::model::{ModelKey, PromptId};
use crate::state::ModelStatus;
use crate::statistics::{DerivedStatistics, calculate_all};

/// Latency and text metrics for one model that completed.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelReport {
    pub model: ModelKey,
    /// False for models that streamed without being selected.
    pub requested: bool,
    pub time_to_first_token_ms: Option<f64>,
    pub total_time_ms: Option<f64>,
    pub response_length: usize,
    pub statistics: DerivedStatistics,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErroredModel {
    pub model: ModelKey,
    pub requested: bool,
    pub error: String,
}

/// Final comparison, built once when every selected model is terminal.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComparisonReport {
    pub prompt_id: PromptId,
    /// Completed models in display order.
    pub finished: Vec<ModelReport>,
    pub errored: Vec<ErroredModel>,
}

fn to_ms(seconds: Option<f64>) -> Option<f64> {
    seconds.map(|s| s * 1000.0)
}

impl ComparisonReport {
    pub fn build(prompt_id: PromptId, models: &[ModelSnapshot]) -> Self {
        let mut finished = Vec::new();
        let mut errored = Vec::new();
        for snapshot in models {
            let state = &snapshot.state;
            match state.status {
                ModelStatus::Complete => finished.push(ModelReport {
                    model: snapshot.model.clone(),
                    requested: snapshot.requested,
                    time_to_first_token_ms: to_ms(state.time_to_first_token),
                    total_time_ms: to_ms(state.total_time),
                    response_length: state.text.chars().count(),
                    statistics: calculate_all(&state.text, state.total_time.unwrap_or(0.0)),
                }),
                ModelStatus::Errored => errored.push(ErroredModel {
                    model: snapshot.model.clone(),
                    requested: snapshot.requested,
                    error: state.error.clone().unwrap_or_default(),
                }),
                ModelStatus::Pending | ModelStatus::Streaming => {}
            }
        }
        Self {
            prompt_id,
            finished,
            errored,
        }
    }

    pub fn get(&self, model: &ModelKey) -> Option<&ModelReport> {
        self.finished.iter().find(|r| &r.model == model)
    }

    /// Lowest time to first token among finished models.
    pub fn fastest_first_token(&self) -> Option<&ModelReport> {
        fastest_by(&self.finished, |r| r.time_to_first_token_ms)
    }

    /// Lowest total generation time among finished models.
    pub fn fastest_total(&self) -> Option<&ModelReport> {
        fastest_by(&self.finished, |r| r.total_time_ms)
    }

    /// Highest estimated tokens per second among finished models.
    pub fn highest_throughput(&self) -> Option<&ModelReport> {
        self.finished
            .iter()
            .filter(|r| r.statistics.tokens_per_second > 0.0)
            .max_by(|a, b| {
                a.statistics
                    .tokens_per_second
                    .total_cmp(&b.statistics.tokens_per_second)
            })
    }
}

fn fastest_by(
    reports: &[ModelReport],
    metric: impl Fn(&ModelReport) -> Option<f64>,
) -> Option<&ModelReport> {
    reports
        .iter()
        .filter_map(|r| metric(r).map(|value| (r, value)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(r, _)| r)
}
