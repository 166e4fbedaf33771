use crate::model::PromptId;

/// Failures opening or reading the HTTP connection behind a subscription or
/// an API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or the connection failed.
    #[error("request failed: {message}")]
    Request { message: String },
    /// Server answered with a non-success status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    /// Reading the response body failed part way through.
    #[error("read failed: {message}")]
    Read { message: String },
}

impl TransportError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Returns the HTTP status for `Status` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { .. } | Self::Read { .. } => None,
        }
    }
}

/// A single inbound record that could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("record has no model_name")]
    MissingModel,
    #[error("record has an invalid shape: {0}")]
    InvalidShape(String),
}

/// Terminal stream-level failure handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// Connection could not be opened or broke while streaming.
    #[error("stream transport failure: {message}")]
    Transport { message: String },
    /// Server sent a stream-wide error record (not tied to one model).
    #[error("server reported stream error: {message}")]
    Server { message: String },
    /// Server closed the stream before every selected model finished.
    #[error("stream ended before all models finished")]
    EndedEarly,
}

impl From<TransportError> for StreamFailure {
    fn from(value: TransportError) -> Self {
        StreamFailure::Transport {
            message: value.to_string(),
        }
    }
}

/// Top-level error type for the public comparison API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Local precondition failed before any network call.
    #[error("validation error: {0}")]
    Validation(String),
    /// Prompt submission failed; nothing was left streaming.
    #[error("submission failed: {0}")]
    Submission(TransportError),
    /// Non-streaming API call failed.
    #[error("api error: {0}")]
    Api(TransportError),
    /// Requested prompt does not exist.
    #[error("prompt not found: {0}")]
    PromptNotFound(PromptId),
    /// Streaming stopped with a stream-level failure.
    #[error(transparent)]
    Stream(StreamFailure),
    /// Caller cancelled before aggregate completion.
    #[error("cancelled")]
    Cancelled,
}

impl From<StreamFailure> for CompareError {
    fn from(value: StreamFailure) -> Self {
        CompareError::Stream(value)
    }
}
