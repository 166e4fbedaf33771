//! Stream transport seam and the HTTP/SSE implementation.
//!
//! The subscription layer only sees a [`RecordStream`] of raw JSON payloads,
//! so tests can swap the network for an in-memory stream.
mod http;

use std::pin::Pin;

pub use http::HttpStreamTransport;
pub(crate) use http::stream_url;

use crate::errors::TransportError;
use crate::model::{PromptId, SelectionSet};

/// Raw `data:` payloads in arrival order. Ends when the server closes.
pub type RecordStream =
    Pin<Box<dyn futures::Stream<Item = Result<String, TransportError>> + Send + 'static>>;

/// Opens the multiplexed event stream for one prompt.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Connects to the stream for `prompt_id`, filtered to `models`.
    async fn connect(
        &self,
        prompt_id: PromptId,
        models: &SelectionSet,
    ) -> Result<RecordStream, TransportError>;
}
