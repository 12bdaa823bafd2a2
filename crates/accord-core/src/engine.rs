//! The protocol engine contract.
//!
//! The scenario engine treats message-level protocol semantics as an
//! external collaborator. One engine instance exists per session; the
//! transport adapter constructs it through an [`EngineFactory`], binds it
//! to a [`PushHandle`] for out-of-band notifications, routes request bodies
//! through [`ProtocolEngine::handle`], and invokes
//! [`ProtocolEngine::dispose`] exactly once on session teardown.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::EngineError;

/// Boxed future returned by [`ProtocolEngine::handle`].
///
/// `Ok(Some(response))` answers a request, `Ok(None)` acknowledges a
/// notification (nothing to send back), `Err` is an internal engine fault.
pub type EngineFuture = Pin<Box<dyn Future<Output = Result<Option<Value>, EngineError>> + Send>>;

/// Message-level protocol implementation for one session.
///
/// Implementations must be cheap to construct (one per session) and must
/// tolerate `dispose` racing a late `handle` call: after `dispose`, pushes
/// on the bound handle go nowhere and `handle` results are discarded by the
/// adapter.
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Bind the engine to its session's push handle.
    ///
    /// Called once, before any `handle` call. Notifications pushed through
    /// the handle reach the session's open server-push stream, if any.
    fn bind(&self, push: PushHandle);

    /// Handle one request or notification body.
    fn handle(&self, request: Value) -> EngineFuture;

    /// Dispose hook, invoked when the owning session is destroyed.
    fn dispose(&self);
}

/// Constructs one [`ProtocolEngine`] instance per session.
pub trait EngineFactory: Send + Sync + 'static {
    fn create(&self) -> Arc<dyn ProtocolEngine>;
}

/// Any `Fn() -> Arc<dyn ProtocolEngine>` closure is a factory.
impl<F> EngineFactory for F
where
    F: Fn() -> Arc<dyn ProtocolEngine> + Send + Sync + 'static,
{
    fn create(&self) -> Arc<dyn ProtocolEngine> {
        self()
    }
}

/// Notification capacity of one push stream.
///
/// A slow or absent consumer drops further pushes rather than blocking the
/// engine; drops are counted and logged.
const PUSH_CHANNEL_CAPACITY: usize = 64;

/// Handle through which an engine pushes asynchronous notifications.
///
/// The handle outlives individual streams: the transport adapter attaches a
/// sender when the session's push stream opens and detaches it when the
/// stream closes or is superseded. Pushes while no stream is attached are
/// dropped.
#[derive(Clone, Default)]
pub struct PushHandle {
    inner: Arc<PushInner>,
}

#[derive(Default)]
struct PushInner {
    sender: Mutex<Option<mpsc::Sender<Value>>>,
    dropped: AtomicU64,
}

impl PushHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one notification toward the open stream.
    ///
    /// Returns `true` if the notification was handed to a live stream.
    pub fn push(&self, notification: Value) -> bool {
        let sender = self.inner.sender.lock().clone();
        match sender {
            Some(tx) => match tx.try_send(notification) {
                Ok(()) => true,
                Err(e) => {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "push notification dropped");
                    false
                }
            },
            None => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("push notification dropped, no open stream");
                false
            }
        }
    }

    /// Attach a stream sender, returning the superseded one if any.
    ///
    /// Dropping the returned sender closes the prior stream, which is
    /// exactly the supersession rule: old handle closed first.
    pub fn attach(&self, tx: mpsc::Sender<Value>) -> Option<mpsc::Sender<Value>> {
        self.inner.sender.lock().replace(tx)
    }

    /// Detach the current stream sender, closing the stream.
    pub fn detach(&self) {
        self.inner.sender.lock().take();
    }

    /// Whether a push stream is currently attached.
    pub fn is_attached(&self) -> bool {
        self.inner.sender.lock().is_some()
    }

    /// Notifications dropped because no stream was open or it was full.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Create a channel sized for one push stream.
    pub fn channel() -> (mpsc::Sender<Value>, mpsc::Receiver<Value>) {
        mpsc::channel(PUSH_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn push_without_stream_is_dropped() {
        let handle = PushHandle::new();
        assert!(!handle.push(json!({"method": "notifications/log"})));
        assert_eq!(handle.dropped(), 1);
    }

    #[tokio::test]
    async fn attach_supersedes_previous_sender() {
        let handle = PushHandle::new();
        let (tx1, mut rx1) = PushHandle::channel();
        let (tx2, mut rx2) = PushHandle::channel();

        assert!(handle.attach(tx1).is_none());
        let superseded = handle.attach(tx2);
        assert!(superseded.is_some());
        drop(superseded);

        // The first receiver sees end-of-stream once its sender is gone.
        assert!(rx1.recv().await.is_none());

        assert!(handle.push(json!({"n": 1})));
        assert_eq!(rx2.recv().await.unwrap()["n"], 1);
    }

    #[tokio::test]
    async fn detach_closes_stream() {
        let handle = PushHandle::new();
        let (tx, mut rx) = PushHandle::channel();
        handle.attach(tx);
        assert!(handle.is_attached());
        handle.detach();
        assert!(!handle.is_attached());
        assert!(rx.recv().await.is_none());
    }
}
