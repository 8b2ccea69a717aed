//! User-facing listener handle

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::args::{classify, ListenerArg, Registration};
use super::entry::{Filter, ListenerId, ListenerInfo};
use super::Registry;
use crate::dispatch::dispatcher;
use crate::error::IrError;
use crate::events::IrEvent;
use crate::producer::{self, ExitWatcher, ProducerHandle};

/// A set of listeners sharing the process-wide producer
///
/// Receivers are independent of each other: ids are scoped to the receiver
/// that issued them. The producer runs while any receiver anywhere has a
/// live listener. Dropping a receiver removes all of its listeners.
pub struct IrReceiver {
    registry: Arc<Registry>,
}

impl IrReceiver {
    /// Create an empty receiver
    pub fn new() -> Self {
        let registry = Arc::new(Registry::default());
        dispatcher().register(&registry);
        Self { registry }
    }

    /// Register a listener from the positional shape
    /// `[key] [remote] callback [throttle_ms] ...`
    ///
    /// Spawns the producer if this is the first live listener anywhere.
    /// Malformed shapes fail with [`IrError::InvalidArguments`] and register
    /// nothing.
    pub fn add_listener<I>(&self, args: I) -> Result<ListenerId, IrError>
    where
        I: IntoIterator<Item = ListenerArg>,
    {
        let args: Vec<ListenerArg> = args.into_iter().collect();
        let registration = classify(&args)?;
        self.add(registration)
    }

    /// Register a listener from a typed description
    pub fn add(&self, registration: Registration) -> Result<ListenerId, IrError> {
        self.register(registration).map(|(id, _)| id)
    }

    /// Register a listener that forwards events into a channel
    ///
    /// The channel closes once the producer serving it exits on its own, so
    /// `recv` returns `None` after the remaining events. The listener stays
    /// registered until removed; once closed it discards events.
    pub fn subscribe(
        &self,
        filter: Filter,
        throttle_ms: Option<u64>,
    ) -> Result<(ListenerId, mpsc::UnboundedReceiver<IrEvent>), IrError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Arc::new(Subscription {
            tx: Mutex::new(Some(tx)),
        });

        let forward = Arc::clone(&sender);
        let mut registration = Registration::new(move |event: &IrEvent| forward.send(event))
            .filter(filter);
        if let Some(ms) = throttle_ms {
            registration = registration.throttle_ms(ms);
        }

        let (id, handle) = self.register(registration)?;

        let watcher: Arc<dyn ExitWatcher> = sender;
        if !producer::watch_exit(handle.generation(), Arc::downgrade(&watcher)) {
            watcher.producer_exited(handle);
        }
        Ok((id, rx))
    }

    fn register(&self, registration: Registration) -> Result<(ListenerId, ProducerHandle), IrError> {
        let (filter, throttle, callback) = registration.into_parts()?;

        let handle = producer::acquire().map_err(|e| {
            warn!(error = e.as_label(), "listener not added: {e}");
            e
        })?;
        let id = self.registry.insert(filter, throttle, callback);

        debug!(
            listener = %id,
            producer = handle.generation(),
            live = self.registry.len(),
            "listener added"
        );
        Ok((id, handle))
    }

    /// Remove a listener. Unknown or already removed ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        if self.registry.remove(id) {
            producer::release_one();
            debug!(listener = %id, live = self.registry.len(), "listener removed");
        }
    }

    /// Remove every listener of this receiver
    pub fn remove_all_listeners(&self) {
        let removed = self.registry.clear();
        for _ in 0..removed {
            producer::release_one();
        }
        if removed > 0 {
            debug!(removed, "all listeners removed");
        }
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live listeners in registration order
    pub fn entries(&self) -> Vec<ListenerInfo> {
        self.registry.infos()
    }
}

/// Sending end of a `subscribe` channel, dropped when its producer exits
struct Subscription {
    tx: Mutex<Option<mpsc::UnboundedSender<IrEvent>>>,
}

impl Subscription {
    fn send(&self, event: &IrEvent) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = tx.as_ref() {
            let _ = tx.send(event.clone());
        }
    }
}

impl ExitWatcher for Subscription {
    fn producer_exited(&self, handle: ProducerHandle) {
        let closed = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            debug!(producer = handle.generation(), "subscription closed");
        }
    }
}

impl Default for IrReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IrReceiver {
    fn drop(&mut self) {
        self.remove_all_listeners();
    }
}

impl std::fmt::Debug for IrReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrReceiver")
            .field("listeners", &self.len())
            .finish()
    }
}
