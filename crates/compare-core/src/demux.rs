use std::collections::HashMap;

use tracing::{debug, warn};

use crate::event::StreamEvent;
use crate::model::{ModelKey, SelectionSet};
use crate::state::{ModelResponseState, Transition};

/// Outcome of routing one event to its model.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    pub model: ModelKey,
    pub transition: Transition,
    /// True when this event created the model's state.
    pub created: bool,
    /// True when the model is not part of the requested selection.
    pub unrequested: bool,
}

/// Routes events to per-model state, creating state for unseen keys.
///
/// Keys are kept in first-seen order so snapshots are stable.
#[derive(Debug, Default)]
pub struct StreamDemultiplexer {
    states: HashMap<ModelKey, ModelResponseState>,
    order: Vec<ModelKey>,
}

impl StreamDemultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `event` to the state for its model key.
    pub fn dispatch(&mut self, event: &StreamEvent, selection: &SelectionSet) -> Dispatch {
        let key = &event.model_key;
        let unrequested = !selection.contains(key);
        let created = !self.states.contains_key(key);
        if created {
            if unrequested {
                warn!(model = %key, "event for unrequested model; tracking it anyway");
            }
            self.order.push(key.clone());
        }
        let state = self.states.entry(key.clone()).or_default();
        let transition = state.apply(event);
        if transition == Transition::Ignored && state.is_terminal() {
            debug!(model = %key, "event after terminal status absorbed");
        }
        Dispatch {
            model: key.clone(),
            transition,
            created,
            unrequested,
        }
    }

    pub fn get(&self, key: &ModelKey) -> Option<&ModelResponseState> {
        self.states.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelKey, &ModelResponseState)> {
        self.order
            .iter()
            .filter_map(|key| self.states.get(key).map(|state| (key, state)))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
