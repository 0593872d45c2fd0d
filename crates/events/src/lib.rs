//! `sahara-events` — subscription mechanics for push-style collaborators.
//!
//! The identity provider notifies the client about sign-in/sign-out through
//! callbacks. This crate turns that into a channel-backed [`Subscription`] so
//! consumers can buffer notifications and drain them on their own schedule.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
