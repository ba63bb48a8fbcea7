//! Listener registry: typed observers of a session's event stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use super::types::ChannelEvent;

const LISTENER_CAPACITY: usize = 256;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    closed: AtomicBool,
    senders: Mutex<HashMap<u64, mpsc::Sender<ChannelEvent>>>,
}

impl ListenerRegistry {
    fn senders(&self) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<ChannelEvent>>> {
        self.senders.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new listener. After `close` the listener is born detached
    /// and its `recv` returns `None` immediately.
    pub(crate) fn register(self: &Arc<Self>) -> Listener {
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut senders = self.senders();
        if !self.closed.load(Ordering::Acquire) {
            senders.insert(id, tx);
        }
        Listener {
            id,
            rx,
            registry: Arc::downgrade(self),
        }
    }

    fn unregister(&self, id: u64) {
        self.senders().remove(&id);
    }

    /// Drop every listener and refuse new ones. Returns how many were removed.
    pub(crate) fn close(&self) -> usize {
        let mut senders = self.senders();
        self.closed.store(true, Ordering::Release);
        let removed = senders.len();
        senders.clear();
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.senders().len()
    }

    /// Deliver `event` to every listener, in registration order.
    pub(crate) async fn dispatch(&self, event: ChannelEvent) {
        let targets: Vec<(u64, mpsc::Sender<ChannelEvent>)> = {
            let senders = self.senders();
            let mut targets: Vec<_> = senders.iter().map(|(id, tx)| (*id, tx.clone())).collect();
            targets.sort_by_key(|(id, _)| *id);
            targets
        };
        for (_, tx) in targets {
            let _ = tx.send(event.clone()).await;
        }
    }
}

/// A registered observer of one session's [`ChannelEvent`]s.
///
/// Dropping the listener unregisters it. Closing the session unregisters
/// every listener; `recv` then drains what was already queued and returns
/// `None`.
pub struct Listener {
    id: u64,
    rx: mpsc::Receiver<ChannelEvent>,
    registry: Weak<ListenerRegistry>,
}

impl Listener {
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.rx.try_recv().ok()
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::TransportKind;

    fn connected() -> ChannelEvent {
        ChannelEvent::Connected {
            transport: TransportKind::WebSocket,
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_every_listener() {
        let registry = Arc::new(ListenerRegistry::default());
        let mut a = registry.register();
        let mut b = registry.register();
        assert_eq!(registry.len(), 2);

        registry.dispatch(connected()).await;
        assert_eq!(a.recv().await, Some(connected()));
        assert_eq!(b.recv().await, Some(connected()));
    }

    #[tokio::test]
    async fn drop_unregisters() {
        let registry = Arc::new(ListenerRegistry::default());
        let a = registry.register();
        let _b = registry.register();
        drop(a);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn close_detaches_existing_and_future_listeners() {
        let registry = Arc::new(ListenerRegistry::default());
        let mut a = registry.register();
        registry.dispatch(connected()).await;

        assert_eq!(registry.close(), 1);
        assert_eq!(registry.len(), 0);
        // Queued events drain, then the stream ends.
        assert_eq!(a.recv().await, Some(connected()));
        assert_eq!(a.recv().await, None);

        let mut late = registry.register();
        assert_eq!(registry.len(), 0);
        assert_eq!(late.recv().await, None);
    }
}
