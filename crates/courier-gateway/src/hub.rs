use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use courier_types::events::BridgeEvent;

pub type SubscriberId = Uuid;

/// Owns the live subscriber set and fans events out to every member.
///
/// Each subscriber is an unbounded channel; a send failure means the
/// receiving side is gone, and the membership heals itself by dropping the
/// handle.  Events queued on one channel stay in broadcast order.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<BridgeEvent>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a new live subscriber.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<BridgeEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut subscribers = self.inner.subscribers.write().await;
        subscribers.insert(id, tx);
        debug!("Subscriber {} joined ({} connected)", id, subscribers.len());

        (id, rx)
    }

    /// Remove a subscriber.  Idempotent: an id that already left is fine.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.inner.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            debug!("Subscriber {} left ({} connected)", id, subscribers.len());
        }
    }

    /// Deliver `event` to every current subscriber.  One dead subscriber
    /// never blocks the rest; dead handles are unsubscribed afterward.
    /// With zero subscribers this is a no-op.
    pub async fn broadcast(&self, event: BridgeEvent) {
        let dead: Vec<SubscriberId> = {
            let subscribers = self.inner.subscribers.read().await;
            subscribers
                .iter()
                .filter(|(_, tx)| tx.send(event.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            let mut subscribers = self.inner.subscribers.write().await;
            for id in dead {
                warn!("Dropping unreachable subscriber {}", id);
                subscribers.remove(&id);
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.inner.subscribers.read().await.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> BridgeEvent {
        BridgeEvent::MessageReceived {
            sender_id: "+15551234567".into(),
            message: text.into(),
            timestamp: 1.0,
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers_in_order() {
        let hub = Hub::new();
        let (_id_a, mut rx_a) = hub.subscribe().await;
        let (_id_b, mut rx_b) = hub.subscribe().await;

        hub.broadcast(event("one")).await;
        hub.broadcast(event("two")).await;

        for rx in [&mut rx_a, &mut rx_b] {
            let BridgeEvent::MessageReceived { message, .. } = rx.try_recv().unwrap() else {
                panic!("wrong event kind");
            };
            assert_eq!(message, "one");
            let BridgeEvent::MessageReceived { message, .. } = rx.try_recv().unwrap() else {
                panic!("wrong event kind");
            };
            assert_eq!(message, "two");
        }
    }

    #[tokio::test]
    async fn dead_subscriber_is_isolated_and_pruned() {
        let hub = Hub::new();
        let (_id_a, mut rx_a) = hub.subscribe().await;
        let (_id_b, rx_b) = hub.subscribe().await;
        let (_id_c, mut rx_c) = hub.subscribe().await;

        // Simulate a vanished client
        drop(rx_b);

        hub.broadcast(event("still here")).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());
        assert_eq!(hub.client_count().await, 2);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = Hub::new();
        let (id, _rx) = hub.subscribe().await;

        hub.unsubscribe(id).await;
        hub.unsubscribe(id).await;

        assert_eq!(hub.client_count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_a_noop() {
        let hub = Hub::new();
        hub.broadcast(event("into the void")).await;
        assert_eq!(hub.client_count().await, 0);
    }
}
