//! In-memory bus backing the test/dev identity provider.

use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, Subscription};

#[derive(Debug, PartialEq, Eq)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned by a panicking publisher.
    Poisoned,
}

/// Fan-out bus over `std::sync::mpsc` channels.
///
/// No IO, no async. Subscribers that have been dropped are removed the next
/// time something is published.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of senders still registered (live or not yet pruned).
    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(subs) => subs.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_messages_drain_in_publish_order() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe();

        bus.publish(1).unwrap();
        bus.publish(2).unwrap();
        bus.publish(3).unwrap();

        assert_eq!(sub.drain(), vec![1, 2, 3]);
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn late_subscriber_misses_earlier_messages() {
        let bus = InMemoryEventBus::new();
        bus.publish("early").unwrap();
        let sub = bus.subscribe();
        bus.publish("late").unwrap();

        assert_eq!(sub.drain(), vec!["late"]);
    }

    #[test]
    fn unsubscribed_receivers_are_pruned_on_publish() {
        let bus = InMemoryEventBus::new();
        let keep = bus.subscribe();
        let gone = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        gone.unsubscribe();
        bus.publish(7u8).unwrap();

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_next(), Some(7));
    }

    fn announce<B: EventBus<&'static str>>(bus: &B, message: &'static str) {
        bus.publish(message).unwrap();
    }

    #[test]
    fn shared_bus_forwards_through_arc() {
        let bus: std::sync::Arc<InMemoryEventBus<&'static str>> = std::sync::Arc::new(InMemoryEventBus::new());
        let shared = bus.clone();
        let sub = shared.subscribe();

        announce(&shared, "signed_in");
        announce(&bus, "signed_out");

        assert_eq!(sub.drain(), vec!["signed_in", "signed_out"]);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
