//! Subscription registry: one delivery channel per (event kind, number)

use crate::device::event::{DerivedEvent, EventKind};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Result of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No subscriber registered for this kind and number
    Unrouted,
    /// The subscriber dropped its receiver; the route has been removed
    Closed,
}

#[derive(Debug)]
pub struct SubscriptionRegistry {
    routes: HashMap<EventKind, HashMap<u8, mpsc::Sender<DerivedEvent>>>,
    default_capacity: usize,
}

impl SubscriptionRegistry {
    pub fn new(default_capacity: usize) -> Self {
        let routes = EventKind::ALL
            .iter()
            .map(|kind| (*kind, HashMap::new()))
            .collect();
        Self {
            routes,
            default_capacity: default_capacity.max(1),
        }
    }

    /// Registers a subscriber with the default buffer
    ///
    /// Replaces any earlier registration for the same kind and number; the
    /// previous receiver gets nothing further and sees its channel close.
    pub fn register(&mut self, kind: EventKind, number: u8) -> mpsc::Receiver<DerivedEvent> {
        self.register_with_capacity(kind, number, self.default_capacity)
    }

    pub fn register_with_capacity(
        &mut self,
        kind: EventKind,
        number: u8,
        capacity: usize,
    ) -> mpsc::Receiver<DerivedEvent> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let replaced = self
            .routes
            .entry(kind)
            .or_default()
            .insert(number, sender)
            .is_some();
        debug!(
            "Registered {} subscriber for #{} (capacity {}, replaced: {})",
            kind, number, capacity, replaced
        );
        receiver
    }

    pub fn unregister(&mut self, kind: EventKind, number: u8) -> bool {
        let removed = self
            .routes
            .get_mut(&kind)
            .and_then(|routes| routes.remove(&number))
            .is_some();
        if removed {
            debug!("Unregistered {} subscriber for #{}", kind, number);
        }
        removed
    }

    pub fn is_registered(&self, kind: EventKind, number: u8) -> bool {
        self.routes
            .get(&kind)
            .is_some_and(|routes| routes.contains_key(&number))
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hands the event to its subscriber, waiting for buffer room
    pub async fn deliver(&mut self, number: u8, event: DerivedEvent) -> Delivery {
        let kind = event.kind();
        let Some(sender) = self.routes.get(&kind).and_then(|r| r.get(&number)) else {
            trace!("No {} subscriber for #{}, dropping", kind, number);
            return Delivery::Unrouted;
        };

        let sent = sender.send(event).await;
        match sent {
            Ok(()) => {
                trace!("Delivered {:?} to {} #{}", event, kind, number);
                Delivery::Delivered
            }
            Err(_) => {
                debug!(
                    "{} subscriber for #{} went away, removing route",
                    kind, number
                );
                self.unregister(kind, number);
                Delivery::Closed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn opened(ms: u64) -> DerivedEvent {
        DerivedEvent::ButtonOpened {
            timestamp: Duration::from_millis(ms),
        }
    }

    #[tokio::test]
    async fn delivers_only_to_matching_kind_and_number() {
        let mut registry = SubscriptionRegistry::new(4);
        let mut open_two = registry.register(EventKind::ButtonOpened, 2);
        let mut close_two = registry.register(EventKind::ButtonClosed, 2);

        assert_eq!(registry.deliver(2, opened(1)).await, Delivery::Delivered);
        assert_eq!(registry.deliver(3, opened(2)).await, Delivery::Unrouted);

        assert_eq!(open_two.recv().await, Some(opened(1)));
        assert!(open_two.try_recv().is_err());
        assert!(close_two.try_recv().is_err());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn re_registering_replaces_the_channel() {
        let mut registry = SubscriptionRegistry::new(4);
        let mut first = registry.register(EventKind::ButtonOpened, 0);
        let mut second = registry.register(EventKind::ButtonOpened, 0);
        assert_eq!(registry.len(), 1);

        registry.deliver(0, opened(7)).await;

        assert_eq!(first.recv().await, None);
        assert_eq!(second.recv().await, Some(opened(7)));
    }

    #[tokio::test]
    async fn dropped_receiver_removes_route() {
        let mut registry = SubscriptionRegistry::new(1);
        let receiver = registry.register(EventKind::ButtonOpened, 5);
        drop(receiver);

        assert_eq!(registry.deliver(5, opened(1)).await, Delivery::Closed);
        assert!(!registry.is_registered(EventKind::ButtonOpened, 5));
        assert_eq!(registry.deliver(5, opened(2)).await, Delivery::Unrouted);
    }

    #[tokio::test]
    async fn unregister_stops_delivery() {
        let mut registry = SubscriptionRegistry::new(2);
        let mut receiver = registry.register(EventKind::ButtonOpened, 1);
        assert!(registry.unregister(EventKind::ButtonOpened, 1));
        assert!(!registry.unregister(EventKind::ButtonOpened, 1));
        assert!(registry.is_empty());
        assert_eq!(receiver.recv().await, None);
    }

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let mut registry = SubscriptionRegistry::new(0);
        let mut receiver = registry.register_with_capacity(EventKind::ButtonOpened, 0, 0);
        assert_eq!(registry.deliver(0, opened(1)).await, Delivery::Delivered);
        assert_eq!(receiver.recv().await, Some(opened(1)));
    }
}
