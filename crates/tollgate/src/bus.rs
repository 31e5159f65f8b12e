//! In-memory publish/subscribe broadcaster for lifecycle events.
//!
//! Purely a live broadcast: no replay, no persistence. Observers that
//! subscribe after an event was published never see it. A slow or dead
//! observer never blocks the publisher or other observers — each gets its
//! own unbounded channel, and observers whose receiver is gone are pruned
//! on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::events::LifecycleEvent;

/// Revocable subscription handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(u64);

/// Fan-out broadcaster shared by the gateway and its observers.
///
/// The subscriber set is the only mutable state shared across requests;
/// `publish` may race freely with `subscribe`/`unsubscribe`.
pub struct EventBus {
    subscribers: DashMap<u64, mpsc::UnboundedSender<LifecycleEvent>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a new observer. Events published after this call are
    /// delivered in publish order; earlier events are not.
    pub fn subscribe(&self) -> (SubscriberHandle, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, tx);
        (SubscriberHandle(id), rx)
    }

    /// Remove an observer. Dropping the receiver has the same effect
    /// lazily: the sender is pruned on the next publish.
    pub fn unsubscribe(&self, handle: SubscriberHandle) {
        self.subscribers.remove(&handle.0);
    }

    /// Deliver `event` to every live observer, pruning dead ones.
    pub fn publish(&self, event: LifecycleEvent) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use uuid::Uuid;

    fn event(kind: EventKind, id: Uuid) -> LifecycleEvent {
        LifecycleEvent::new(kind, id)
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();

        let (_h1, mut rx1) = bus.subscribe();
        bus.publish(event(EventKind::VerifyStarted, id));
        bus.publish(event(EventKind::VerifyCompleted, id));

        let (_h2, mut rx2) = bus.subscribe();
        bus.publish(event(EventKind::SettleStarted, id));

        assert_eq!(rx1.recv().await.unwrap().kind, EventKind::VerifyStarted);
        assert_eq!(rx1.recv().await.unwrap().kind, EventKind::VerifyCompleted);
        assert_eq!(rx1.recv().await.unwrap().kind, EventKind::SettleStarted);

        // Only the event published after subscribing.
        assert_eq!(rx2.recv().await.unwrap().kind, EventKind::SettleStarted);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_does_not_affect_other_observers() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();

        let (h1, mut rx1) = bus.subscribe();
        let (_h2, mut rx2) = bus.subscribe();

        bus.publish(event(EventKind::VerifyStarted, id));
        bus.unsubscribe(h1);
        bus.publish(event(EventKind::VerifyCompleted, id));

        assert_eq!(rx1.recv().await.unwrap().kind, EventKind::VerifyStarted);
        assert!(rx1.recv().await.is_none());

        assert_eq!(rx2.recv().await.unwrap().kind, EventKind::VerifyStarted);
        assert_eq!(rx2.recv().await.unwrap().kind, EventKind::VerifyCompleted);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_publish() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();

        let (_h1, rx1) = bus.subscribe();
        let (_h2, mut rx2) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx1);
        bus.publish(event(EventKind::VerifyStarted, id));

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(rx2.recv().await.unwrap().kind, EventKind::VerifyStarted);
    }

    #[tokio::test]
    async fn publish_order_is_preserved_per_observer() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();
        let (_h, mut rx) = bus.subscribe();

        let kinds = [
            EventKind::VerifyStarted,
            EventKind::VerifyCompleted,
            EventKind::SettleStarted,
            EventKind::SettleCompleted,
        ];
        for k in kinds {
            bus.publish(event(k, id));
        }
        for k in kinds {
            assert_eq!(rx.recv().await.unwrap().kind, k);
        }
    }
}
