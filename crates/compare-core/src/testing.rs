//! In-memory `StreamTransport` used by unit tests.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::StreamExt as _;
use futures::stream;

use crate::errors::TransportError;
use crate::model::{PromptId, SelectionSet};
use crate::transport::{RecordStream, StreamTransport};

type Item = Result<String, TransportError>;

pub(crate) enum FakeBehavior {
    ConnectError(TransportError),
    /// Yields the items, then ends the stream.
    Records(Vec<Item>),
    /// Yields the payloads, then stays open until cancelled.
    RecordsThenPending(Vec<String>),
    Pending,
}

/// Flips `released` when the record stream (the "connection") is dropped.
struct ReleaseOnDrop(Arc<AtomicBool>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct FakeTransport {
    pub connects: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
    behavior: FakeBehavior,
}

impl FakeTransport {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            connects: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            behavior,
        }
    }
}

#[async_trait::async_trait]
impl StreamTransport for FakeTransport {
    async fn connect(
        &self,
        _prompt_id: PromptId,
        _models: &SelectionSet,
    ) -> Result<RecordStream, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let records: RecordStream = match &self.behavior {
            FakeBehavior::ConnectError(err) => return Err(err.clone()),
            FakeBehavior::Records(records) => Box::pin(stream::iter(records.clone())),
            FakeBehavior::RecordsThenPending(records) => Box::pin(
                stream::iter(records.clone().into_iter().map(Ok::<String, TransportError>))
                    .chain(stream::pending::<Item>()),
            ),
            FakeBehavior::Pending => Box::pin(stream::pending::<Item>()),
        };
        let guard = ReleaseOnDrop(self.released.clone());
        Ok(Box::pin(records.map(move |item| {
            let _held = &guard;
            item
        })))
    }
}

/// Serializes an event the way the server does for `data:` payloads.
pub(crate) fn payload(event: &crate::event::StreamEvent) -> String {
    serde_json::to_string(event).expect("serialize event")
}
