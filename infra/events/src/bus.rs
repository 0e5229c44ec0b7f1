use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

const DEFAULT_CAPACITY: usize = 128;

/// Marker trait for types that can be sent across the [`EventBus`].
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Fan-out: every subscriber sees every event published after it subscribed.
    Broadcast,
    /// Latest value: subscribers see the current value and then changes.
    Watch,
}

#[derive(Debug)]
struct Channel {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

impl Channel {
    fn sender<S: Clone + 'static, T: Event>(
        &self,
        expected: ChannelKind,
    ) -> Result<S, EventBusError> {
        if self.kind != expected {
            return Err(EventBusError::ChannelKindMismatch {
                message: format!("{} is registered as {:?}", type_name::<T>(), self.kind).into(),
                context: Some(format!("requested {expected:?}").into()),
            });
        }
        self.sender.downcast_ref::<S>().cloned().ok_or_else(|| EventBusError::TypeMismatch {
            message: type_name::<T>().into(),
            context: Some("Unexpected sender type".into()),
        })
    }
}

/// A typed event bus keyed by the event's [`TypeId`].
///
/// Each event type owns exactly one channel, either broadcast or watch, fixed by
/// whichever call touches the type first. Cloning shares the channels.
///
/// # Example
/// ```rust
/// use sbox_event_bus::{EventBus, EventReceiverExt};
///
/// #[derive(Debug, PartialEq)]
/// struct Locked(&'static str);
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), sbox_event_bus::EventBusError> {
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe::<Locked>()?;
/// bus.publish(Locked("acct-1"))?;
/// assert_eq!(rx.recv_event().await.unwrap().0, "acct-1");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, Channel>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self { channels: Arc::default(), capacity: DEFAULT_CAPACITY }
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus whose broadcast channels buffer `capacity` events per subscriber.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, EventBusError> {
        if capacity == 0 {
            return Err(EventBusError::InvalidCapacity {
                message: "capacity must be >= 1".into(),
                context: None,
            });
        }
        Ok(Self { capacity, ..Self::default() })
    }

    /// Subscribes to broadcast events of type `T`.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is a watch channel.
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        Ok(self.broadcast_sender::<T>()?.subscribe())
    }

    /// Publishes to every current subscriber; returns how many received it.
    ///
    /// Publishing with no subscribers is not an error.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is a watch channel.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        let sender = self.broadcast_sender::<T>()?;
        let delivered = sender.send(Arc::new(event)).unwrap_or(0);
        trace!(event = type_name::<T>(), delivered, "Event dispatched");
        Ok(delivered)
    }

    /// Subscribes to the latest value of `T`, seeding the channel with `initial`
    /// if nobody has published yet.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is a broadcast channel.
    pub fn subscribe_watch<T: Event>(
        &self,
        initial: impl FnOnce() -> T,
    ) -> Result<watch::Receiver<Arc<T>>, EventBusError> {
        Ok(self.watch_sender::<T>(initial)?.subscribe())
    }

    /// Replaces the latest value of `T`, notifying watchers.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is a broadcast channel.
    pub fn publish_watch<T: Event>(&self, value: T) -> Result<(), EventBusError> {
        let value = Arc::new(value);
        let seed = Arc::clone(&value);
        let sender = self.watch_sender_arc::<T>(move || seed)?;
        sender.send_replace(value);
        trace!(event = type_name::<T>(), "Watch value replaced");
        Ok(())
    }

    /// Current value of a watch channel, if one exists.
    #[must_use]
    pub fn latest<T: Event>(&self) -> Option<Arc<T>> {
        let channels = self.channels.read();
        let channel = channels.get(&TypeId::of::<T>())?;
        let sender = channel.sender::<watch::Sender<Arc<T>>, T>(ChannelKind::Watch).ok()?;
        drop(channels);
        Some(Arc::clone(&sender.borrow()))
    }

    /// Drops every channel, closing all receivers. Returns how many were closed.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        let mut channels = self.channels.write();
        let count = channels.len();
        channels.clear();
        count
    }

    fn broadcast_sender<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let capacity = self.capacity;
        self.get_or_insert::<T, _>(ChannelKind::Broadcast, || {
            let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
            Box::new(tx)
        })
    }

    fn watch_sender<T: Event>(
        &self,
        initial: impl FnOnce() -> T,
    ) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        self.watch_sender_arc::<T>(|| Arc::new(initial()))
    }

    fn watch_sender_arc<T: Event>(
        &self,
        initial: impl FnOnce() -> Arc<T>,
    ) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        self.get_or_insert::<T, _>(ChannelKind::Watch, || {
            let (tx, _) = watch::channel(initial());
            Box::new(tx)
        })
    }

    fn get_or_insert<T: Event, S: Clone + 'static>(
        &self,
        kind: ChannelKind,
        create: impl FnOnce() -> Box<dyn Any + Send + Sync>,
    ) -> Result<S, EventBusError> {
        let id = TypeId::of::<T>();

        if let Some(channel) = self.channels.read().get(&id) {
            return channel.sender::<S, T>(kind);
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(id).or_insert_with(|| {
            trace!(event = type_name::<T>(), ?kind, "Initializing event channel");
            Channel { kind, sender: create() }
        });
        channel.sender::<S, T>(kind)
    }
}
