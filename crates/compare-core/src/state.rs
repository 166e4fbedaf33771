use crate::event::StreamEvent;

/// Lifecycle of one model's response. Only moves forward; `Complete` and
/// `Errored` are absorbing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    #[default]
    Pending,
    Streaming,
    Complete,
    Errored,
}

impl ModelStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ModelStatus::Complete | ModelStatus::Errored)
    }
}

/// What a single `apply` did to the state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Nothing changed (already terminal, or nothing applicable in the event).
    Ignored,
    /// Non-terminal progress: text appended or timings updated.
    Progressed,
    /// The model just entered a terminal status.
    Terminated(ModelStatus),
}

impl Transition {
    pub fn is_terminal(self) -> bool {
        matches!(self, Transition::Terminated(_))
    }

    pub fn changed(self) -> bool {
        !matches!(self, Transition::Ignored)
    }
}

/// Accumulated response for one model.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelResponseState {
    pub text: String,
    pub time_to_first_token: Option<f64>,
    pub total_time: Option<f64>,
    pub status: ModelStatus,
    pub error: Option<String>,
}

impl ModelResponseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies one event and reports the transition.
    ///
    /// Once terminal every event is ignored, so duplicate completion or error
    /// records cannot re-trigger downstream work. An error always wins over
    /// `is_complete` in the same record.
    pub fn apply(&mut self, event: &StreamEvent) -> Transition {
        if self.status.is_terminal() {
            return Transition::Ignored;
        }

        if let Some(message) = event.error_message() {
            self.error = Some(message.to_string());
            self.status = ModelStatus::Errored;
            return Transition::Terminated(ModelStatus::Errored);
        }

        let mut progressed = false;
        if let Some(token) = event.token_text() {
            self.text.push_str(token);
            if self.status == ModelStatus::Pending {
                self.status = ModelStatus::Streaming;
            }
            if self.time_to_first_token.is_none() {
                self.time_to_first_token = event.time_to_first_token;
            }
            if event.total_time.is_some() {
                self.total_time = event.total_time;
            }
            progressed = true;
        }

        if event.is_complete {
            if event.time_to_first_token.is_some() {
                self.time_to_first_token = event.time_to_first_token;
            }
            if event.total_time.is_some() {
                self.total_time = event.total_time;
            }
            self.status = ModelStatus::Complete;
            return Transition::Terminated(ModelStatus::Complete);
        }

        if progressed {
            Transition::Progressed
        } else {
            Transition::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_all(state: &mut ModelResponseState, events: &[StreamEvent]) -> Vec<Transition> {
        events.iter().map(|e| state.apply(e)).collect()
    }

    #[test]
    fn tokens_append_in_arrival_order() {
        let mut state = ModelResponseState::new();
        let transitions = apply_all(
            &mut state,
            &[
                StreamEvent::token("m", "Hel", None, None),
                StreamEvent::token("m", "lo", None, None),
                StreamEvent::token("m", " world", None, None),
            ],
        );
        assert_eq!(state.text, "Hello world");
        assert_eq!(state.status, ModelStatus::Streaming);
        assert!(transitions.iter().all(|t| *t == Transition::Progressed));
    }

    #[test]
    fn first_token_time_is_first_write_until_completion_overrides() {
        let mut state = ModelResponseState::new();
        state.apply(&StreamEvent::token("m", "a", Some(0.3), Some(0.3)));
        state.apply(&StreamEvent::token("m", "b", Some(0.9), Some(0.9)));
        assert_eq!(state.time_to_first_token, Some(0.3));
        assert_eq!(state.total_time, Some(0.9));

        let transition = state.apply(&StreamEvent::complete("m", Some(0.35), Some(1.2)));
        assert_eq!(transition, Transition::Terminated(ModelStatus::Complete));
        assert_eq!(state.time_to_first_token, Some(0.35));
        assert_eq!(state.total_time, Some(1.2));
    }

    #[test]
    fn completion_without_timings_keeps_streamed_values() {
        let mut state = ModelResponseState::new();
        state.apply(&StreamEvent::token("m", "a", Some(0.2), Some(0.5)));
        state.apply(&StreamEvent::complete("m", None, None));
        assert_eq!(state.time_to_first_token, Some(0.2));
        assert_eq!(state.total_time, Some(0.5));
    }

    #[test]
    fn terminal_states_absorb_every_later_event() {
        for terminal in [
            StreamEvent::complete("m", Some(0.1), Some(1.0)),
            StreamEvent::error("m", "boom"),
        ] {
            let mut state = ModelResponseState::new();
            state.apply(&StreamEvent::token("m", "x", Some(0.1), Some(0.2)));
            assert!(state.apply(&terminal).is_terminal());
            let frozen = state.clone();

            let later = [
                terminal.clone(),
                StreamEvent::token("m", "y", Some(9.0), Some(9.0)),
                StreamEvent::complete("m", Some(5.0), Some(5.0)),
                StreamEvent::error("m", "late"),
            ];
            for event in &later {
                assert_eq!(state.apply(event), Transition::Ignored);
            }
            assert_eq!(state, frozen);
        }
    }

    #[test]
    fn error_latches_from_any_non_terminal_status() {
        let mut pending = ModelResponseState::new();
        assert_eq!(
            pending.apply(&StreamEvent::error("m", "quota")),
            Transition::Terminated(ModelStatus::Errored)
        );
        assert_eq!(pending.error.as_deref(), Some("quota"));

        let mut streaming = ModelResponseState::new();
        streaming.apply(&StreamEvent::token("m", "partial", None, None));
        streaming.apply(&StreamEvent::error("m", "dropped"));
        assert_eq!(streaming.status, ModelStatus::Errored);
        assert_eq!(streaming.text, "partial");
    }

    #[test]
    fn token_and_completion_in_one_record_apply_both() {
        let mut state = ModelResponseState::new();
        let mut event = StreamEvent::token("m", "only", Some(0.4), Some(0.4));
        event.is_complete = true;
        assert!(state.apply(&event).is_terminal());
        assert_eq!(state.text, "only");
        assert_eq!(state.status, ModelStatus::Complete);
    }

    #[test]
    fn empty_event_is_ignored() {
        let mut state = ModelResponseState::new();
        let mut event = StreamEvent::token("m", "", Some(0.1), Some(0.1));
        assert_eq!(state.apply(&event), Transition::Ignored);
        event.token = None;
        assert_eq!(state.apply(&event), Transition::Ignored);
        assert_eq!(state, ModelResponseState::new());
    }
}
