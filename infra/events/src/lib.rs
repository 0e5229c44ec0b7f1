//! # Event Bus
//!
//! A typed in-process bus built on `tokio` broadcast and watch channels.
//! Events are identified by their Rust type; broadcast carries discrete notifications
//! (an account locked, a key rotated) and watch carries current state (which account
//! is active).

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
