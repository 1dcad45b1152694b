//! Broadcast stream handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use super::{BroadcastSource, StreamId};

/// A [`BroadcastSource`] whose termination the ingest task can await
#[derive(Debug)]
pub struct BroadcastHandle {
    id: StreamId,
    terminated: AtomicBool,
    notify: Notify,
}

impl BroadcastHandle {
    pub fn new(id: StreamId) -> Arc<Self> {
        Arc::new(Self {
            id,
            terminated: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Resolves once the relay has terminated this stream
    pub async fn terminated(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_terminated() {
                return;
            }
            notified.await;
        }
    }
}

impl BroadcastSource for BroadcastHandle {
    fn id(&self) -> StreamId {
        self.id
    }

    fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            tracing::debug!(stream = %self.id, "Broadcast source terminated");
        }
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_terminate_wakes_waiter() {
        let handle = BroadcastHandle::new(StreamId(1));
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.terminated().await })
        };

        tokio::task::yield_now().await;
        handle.terminate();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
        assert!(handle.is_terminated());
    }

    #[tokio::test]
    async fn test_already_terminated_returns_immediately() {
        let handle = BroadcastHandle::new(StreamId(2));
        handle.terminate();
        handle.terminate();
        handle.terminated().await;
        assert_eq!(handle.id(), StreamId(2));
    }
}
