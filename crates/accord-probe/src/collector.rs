//! Push-notification collection with a bounded quiescence window.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

use accord_core::rpc::notifications;

/// How long a probe waits for asynchronous push notifications before
/// evaluating them.
///
/// This is a deliberate completeness/determinism tradeoff: a producer whose
/// notifications arrive after the window is scored as having produced too
/// few, in exchange for a bounded test run time. Fast producers are not
/// penalized, because the wait completes as soon as the expected count is
/// observed.
pub const DEFAULT_QUIESCENCE_WINDOW: Duration = Duration::from_millis(500);

/// Classification of a pushed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Log,
    Progress,
}

#[derive(Default)]
struct CollectorInner {
    logs: Mutex<Vec<Value>>,
    progress: Mutex<Vec<Value>>,
    other: Mutex<Vec<Value>>,
    notify: Notify,
}

/// Collects notifications read off the push stream, classified by kind.
///
/// Cloning shares the underlying store; the probe's stream-reader task
/// records into one clone while scenario code waits on another.
#[derive(Clone, Default)]
pub struct NotificationCollector {
    inner: Arc<CollectorInner>,
}

impl NotificationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one notification and wake any waiter.
    pub fn record(&self, notification: Value) {
        let method = notification.get("method").and_then(Value::as_str);
        match method {
            Some(notifications::LOG) => self.inner.logs.lock().push(notification),
            Some(notifications::PROGRESS) => self.inner.progress.lock().push(notification),
            _ => self.inner.other.lock().push(notification),
        }
        self.inner.notify.notify_waiters();
    }

    pub fn logs(&self) -> Vec<Value> {
        self.inner.logs.lock().clone()
    }

    pub fn progress(&self) -> Vec<Value> {
        self.inner.progress.lock().clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        match kind {
            NotificationKind::Log => self.inner.logs.lock().len(),
            NotificationKind::Progress => self.inner.progress.lock().len(),
        }
    }

    /// The `progress` values of collected progress notifications, in
    /// arrival order.
    pub fn progress_values(&self) -> Vec<f64> {
        self.inner
            .progress
            .lock()
            .iter()
            .filter_map(|n| n.pointer("/params/progress").and_then(Value::as_f64))
            .collect()
    }

    /// Wait until at least `min` notifications of `kind` have arrived or
    /// the window elapses, whichever comes first. Returns the count seen.
    ///
    /// One deadline plus a completion signal; no polling.
    pub async fn wait_for(&self, kind: NotificationKind, min: usize, window: Duration) -> usize {
        let deadline = Instant::now() + window;
        loop {
            // Register for wakeup before checking, so a notification that
            // lands between the check and the await is not missed.
            let notified = self.inner.notify.notified();
            let count = self.count(kind);
            if count >= min {
                return count;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.count(kind);
            }
        }
    }
}
