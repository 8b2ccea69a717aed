//! Dispatch of parsed events to every live registry
//!
//! One pass per event: passes never overlap. Within a registry callbacks
//! run in registration order; the order across registries is the order in
//! which they were created, but callers should not rely on it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Instant;

use tracing::{error, trace};

use crate::events::IrEvent;
use crate::producer;
use crate::registry::{Callback, ListenerId, Registry};

pub(crate) struct Dispatcher {
    registries: Mutex<Vec<Weak<Registry>>>,
    pass: Mutex<()>,
}

/// The process-wide dispatcher
pub(crate) fn dispatcher() -> &'static Dispatcher {
    static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();
    DISPATCHER.get_or_init(|| Dispatcher {
        registries: Mutex::new(Vec::new()),
        pass: Mutex::new(()),
    })
}

impl Dispatcher {
    fn registries(&self) -> MutexGuard<'_, Vec<Weak<Registry>>> {
        self.registries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a new registry; dropped registries are pruned here and on dispatch
    pub(crate) fn register(&self, registry: &Arc<Registry>) {
        let mut registries = self.registries();
        registries.retain(|weak| weak.strong_count() > 0);
        registries.push(Arc::downgrade(registry));
    }

    /// Deliver `event`, read from producer `generation`, to every matching
    /// listener; returns how many callbacks completed without panicking
    ///
    /// Nothing is delivered once that producer has been killed or replaced.
    pub(crate) fn dispatch(&self, generation: u64, event: &IrEvent) -> usize {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);

        if !producer::is_current(generation) {
            trace!(generation, %event, "dropping event from stale producer");
            return 0;
        }

        let live: Vec<Arc<Registry>> = {
            let mut registries = self.registries();
            registries.retain(|weak| weak.strong_count() > 0);
            registries.iter().filter_map(Weak::upgrade).collect()
        };

        let now = Instant::now();
        let mut delivered = 0;
        for registry in live {
            for (id, callback) in registry.select(event, now) {
                if invoke(id, &callback, event) {
                    delivered += 1;
                }
            }
        }

        trace!(%event, delivered, "event dispatched");
        delivered
    }
}

/// Run one callback, isolating a panic to that listener
fn invoke(id: ListenerId, callback: &Callback, event: &IrEvent) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                listener = %id,
                key = %event.key,
                panic = panic_message(payload.as_ref()),
                "listener callback panicked"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
