use crate::demux::StreamDemultiplexer;
use crate::model::SelectionSet;

/// Edge-triggered check for "every selected model is terminal".
///
/// `evaluate` returns `true` exactly once per submission. Models outside the
/// selection never count toward completion.
#[derive(Debug, Default)]
pub struct CompletionDetector {
    fired: bool,
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level check: are all selected models terminal right now?
    pub fn all_done(selection: &SelectionSet, states: &StreamDemultiplexer) -> bool {
        !selection.is_empty()
            && selection
                .iter()
                .all(|key| states.get(key).is_some_and(|state| state.is_terminal()))
    }

    /// Returns `true` only on the first call that observes completion.
    pub fn evaluate(&mut self, selection: &SelectionSet, states: &StreamDemultiplexer) -> bool {
        if self.fired {
            return false;
        }
        if Self::all_done(selection, states) {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
