//! Publish/subscribe contract (mechanics only).
//!
//! Delivery is in publish order per subscriber. Messages published while a
//! consumer is busy are buffered in its channel, not dropped; that is what lets
//! a consumer subscribe first and query state second without losing anything
//! emitted in between.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

/// Receiving end of a subscription.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`]) ends
/// delivery; publishers prune the dead sender on their next publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Take the next buffered message without blocking.
    pub fn try_next(&self) -> Option<M> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every message buffered so far, oldest first.
    ///
    /// Messages published while the returned batch is being processed stay
    /// buffered for the next drain.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// Stop receiving. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {
        tracing::debug!("subscription closed");
    }
}

/// Transport-agnostic pub/sub.
///
/// Every subscriber receives its own copy of each message published after it
/// subscribed.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
