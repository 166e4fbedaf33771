use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::errors::{CompareError, StreamFailure};
use crate::model::{PromptId, SelectionSet};
use crate::transport::StreamTransport;

struct CancelInner {
    cancelled: AtomicBool,
    tx: watch::Sender<bool>,
}

/// Capability to cancel one subscription.
///
/// Cloneable and safe to call from any task. Only the first `cancel()` has an
/// effect; later calls return `false`.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

impl CancelHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                tx,
            }),
        };
        (handle, rx)
    }

    /// Requests cancellation. Returns `true` for the call that cancelled.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.inner.tx.send(true);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

/// What the subscription task hands to its consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionNotice {
    /// One raw record payload.
    Record(String),
    /// Connection failed or broke. Sent at most once; the subscription is closed.
    Failed(StreamFailure),
    /// Server closed the stream normally.
    Ended,
    /// Subscription was cancelled through its `CancelHandle`.
    Cancelled,
}

impl SubscriptionNotice {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionNotice::Record(_))
    }
}

/// Opens subscriptions over a `StreamTransport`.
#[derive(Clone)]
pub struct SubscriptionManager {
    transport: Arc<dyn StreamTransport>,
    buffer_capacity: usize,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            buffer_capacity: ClientConfig::default().stream_buffer_capacity,
        }
    }

    /// Sets the bounded buffer size between the stream task and the consumer.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Opens one stream scoped to `prompt_id`, filtered to `selection`.
    ///
    /// Connection happens on a background task; a connect failure arrives as
    /// `SubscriptionNotice::Failed`. Must be called inside a tokio runtime.
    pub fn open(
        &self,
        prompt_id: PromptId,
        selection: &SelectionSet,
    ) -> Result<Subscription, CompareError> {
        if selection.is_empty() {
            return Err(CompareError::Validation(
                "select at least one model to compare".into(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(CompareError::Validation(
                "stream buffer capacity must be greater than 0".into(),
            ));
        }

        let id = uuid::Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer_capacity);
        let (cancel, cancel_rx) = CancelHandle::new();
        info!(
            subscription_id = %id,
            prompt_id = %prompt_id,
            models = selection.len(),
            "opening subscription"
        );
        tokio::spawn(pump_task(
            id,
            self.transport.clone(),
            prompt_id,
            selection.clone(),
            tx,
            cancel_rx,
        ));

        Ok(Subscription {
            id,
            prompt_id,
            rx,
            cancel,
            closed: false,
        })
    }
}

/// Live handle for one open stream.
///
/// Dropping it cancels the stream, so the connection is released on every
/// exit path.
pub struct Subscription {
    id: uuid::Uuid,
    prompt_id: PromptId,
    rx: mpsc::Receiver<SubscriptionNotice>,
    cancel: CancelHandle,
    closed: bool,
}

impl Subscription {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn prompt_id(&self) -> PromptId {
        self.prompt_id
    }

    /// Returns a handle that can cancel this subscription from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancels the subscription. Idempotent.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Waits for the next notice.
    ///
    /// After a terminal notice (`Failed`, `Ended`, `Cancelled`) this returns
    /// `None`.
    pub async fn next_notice(&mut self) -> Option<SubscriptionNotice> {
        if self.closed {
            return None;
        }
        let notice = match self.rx.recv().await {
            Some(notice) => notice,
            None if self.cancel.is_cancelled() => SubscriptionNotice::Cancelled,
            None => SubscriptionNotice::Ended,
        };
        if notice.is_terminal() {
            self.closed = true;
        }
        Some(notice)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.cancel.cancel() {
            debug!(subscription_id = %self.id, "subscription dropped; cancelled");
        }
    }
}

enum Delivery {
    Sent,
    Cancelled,
    ConsumerGone,
}

/// Sends `notice` unless cancellation arrives first, so a full buffer never
/// keeps the connection open after `cancel()`.
async fn deliver(
    tx: &mpsc::Sender<SubscriptionNotice>,
    cancel_rx: &mut watch::Receiver<bool>,
    notice: SubscriptionNotice,
) -> Delivery {
    tokio::select! {
        biased;
        _ = wait_cancelled(cancel_rx) => Delivery::Cancelled,
        sent = tx.send(notice) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::ConsumerGone,
        },
    }
}

async fn pump_task(
    id: uuid::Uuid,
    transport: Arc<dyn StreamTransport>,
    prompt_id: PromptId,
    selection: SelectionSet,
    tx: mpsc::Sender<SubscriptionNotice>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let connected = tokio::select! {
        biased;
        _ = wait_cancelled(&mut cancel_rx) => None,
        connected = transport.connect(prompt_id, &selection) => Some(connected),
    };
    let mut records = match connected {
        Some(Ok(records)) => records,
        Some(Err(err)) => {
            error!(
                subscription_id = %id,
                prompt_id = %prompt_id,
                error = %err,
                "stream connect failed"
            );
            let _ = deliver(&tx, &mut cancel_rx, SubscriptionNotice::Failed(err.into())).await;
            return;
        }
        None => {
            info!(subscription_id = %id, "subscription cancelled before connect");
            let _ = tx.try_send(SubscriptionNotice::Cancelled);
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancel_rx) => break,
            next = records.next() => next,
        };
        let notice = match next {
            Some(Ok(payload)) => SubscriptionNotice::Record(payload),
            Some(Err(err)) => {
                error!(subscription_id = %id, error = %err, "stream read failed");
                SubscriptionNotice::Failed(err.into())
            }
            None => {
                info!(subscription_id = %id, "server closed stream");
                SubscriptionNotice::Ended
            }
        };
        let terminal = notice.is_terminal();
        match deliver(&tx, &mut cancel_rx, notice).await {
            Delivery::Sent if !terminal => {}
            Delivery::Sent => return,
            Delivery::Cancelled => break,
            Delivery::ConsumerGone => {
                debug!(subscription_id = %id, "consumer dropped; closing stream");
                return;
            }
        }
    }

    // Release the connection before telling the consumer; a full buffer
    // surfaces as `Cancelled` once the channel closes.
    drop(records);
    info!(subscription_id = %id, "subscription cancelled");
    let _ = tx.try_send(SubscriptionNotice::Cancelled);
}

/// Resolves once cancellation is requested (or the handle side is gone).
async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
