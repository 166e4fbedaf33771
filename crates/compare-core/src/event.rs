use crate::errors::RecordError;
use crate::model::ModelKey;

/// One inbound progress record for one model.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "model_name")]
    pub model_key: ModelKey,
    #[serde(default)]
    pub token: Option<String>,
    /// Seconds from request start to the first token.
    #[serde(default)]
    pub time_to_first_token: Option<f64>,
    /// Seconds elapsed so far (or in total, on the completion record).
    #[serde(default)]
    pub total_time: Option<f64>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamEvent {
    /// Token record with streaming-phase timings.
    pub fn token(
        model: impl Into<ModelKey>,
        token: impl Into<String>,
        time_to_first_token: Option<f64>,
        total_time: Option<f64>,
    ) -> Self {
        Self {
            model_key: model.into(),
            token: Some(token.into()),
            time_to_first_token,
            total_time,
            ..Self::default()
        }
    }

    /// Completion record carrying the authoritative final timings.
    pub fn complete(
        model: impl Into<ModelKey>,
        time_to_first_token: Option<f64>,
        total_time: Option<f64>,
    ) -> Self {
        Self {
            model_key: model.into(),
            time_to_first_token,
            total_time,
            is_complete: true,
            ..Self::default()
        }
    }

    /// Error record. The server marks these complete as well.
    pub fn error(model: impl Into<ModelKey>, message: impl Into<String>) -> Self {
        Self {
            model_key: model.into(),
            is_complete: true,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Token text, treating an empty string as absent.
    pub fn token_text(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Decoded form of one raw `data:` payload.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamRecord {
    /// Progress for one model.
    Model(StreamEvent),
    /// Stream-wide error with no model attached.
    StreamError { message: String },
}

impl StreamRecord {
    /// Parses one JSON payload.
    ///
    /// A payload with `error` but no `model_name` is a stream-wide error; any
    /// other payload without a model name is malformed.
    pub fn decode(raw: &str) -> Result<Self, RecordError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| RecordError::InvalidJson(e.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(RecordError::InvalidShape("expected a JSON object".into()));
        };

        let model_name = object.get("model_name").and_then(|v| v.as_str());
        match model_name {
            Some(name) if !name.trim().is_empty() => {}
            _ => {
                if let Some(message) = object.get("error").and_then(|v| v.as_str()) {
                    return Ok(StreamRecord::StreamError {
                        message: message.to_string(),
                    });
                }
                return Err(RecordError::MissingModel);
            }
        }

        let event: StreamEvent = serde_json::from_value(value)
            .map_err(|e| RecordError::InvalidShape(e.to_string()))?;
        Ok(StreamRecord::Model(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_token_record_with_nulls() {
        let raw = r#"{"model_name":"xai.grok-4","token":"Hi","time_to_first_token":0.4,
            "total_time":null,"is_complete":false,"error":null}"#;
        let record = StreamRecord::decode(raw).expect("decode");
        assert_eq!(
            record,
            StreamRecord::Model(StreamEvent::token("xai.grok-4", "Hi", Some(0.4), None))
        );
    }

    #[test]
    fn decodes_error_record_as_complete_error() {
        let raw = r#"{"model_name":"m","is_complete":true,"error":"rate limited"}"#;
        let StreamRecord::Model(event) = StreamRecord::decode(raw).expect("decode") else {
            panic!("expected model record");
        };
        assert!(event.is_complete);
        assert_eq!(event.error_message(), Some("rate limited"));
    }

    #[test]
    fn error_without_model_is_stream_error() {
        let record = StreamRecord::decode(r#"{"error":"No models available"}"#).expect("decode");
        assert_eq!(
            record,
            StreamRecord::StreamError {
                message: "No models available".into()
            }
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            StreamRecord::decode("{not json"),
            Err(RecordError::InvalidJson(_))
        ));
        assert!(matches!(
            StreamRecord::decode("[1,2]"),
            Err(RecordError::InvalidShape(_))
        ));
        assert!(matches!(
            StreamRecord::decode(r#"{"token":"x"}"#),
            Err(RecordError::MissingModel)
        ));
        assert!(matches!(
            StreamRecord::decode(r#"{"model_name":"m","is_complete":"yes"}"#),
            Err(RecordError::InvalidShape(_))
        ));
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let event = StreamEvent::token("m", "", None, None);
        assert_eq!(event.token_text(), None);
    }
}
