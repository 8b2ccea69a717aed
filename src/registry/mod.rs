//! Registry module: per-handle listener storage
//!
//! Each [`IrReceiver`] owns an arena of listener entries. Removal leaves a
//! tombstone, so ids are never reused and stay valid for the registry's
//! whole life.

mod args;
mod entry;
mod receiver;
mod throttle;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub use args::{classify, ListenerArg, Registration};
pub use entry::{Callback, Filter, ListenerId, ListenerInfo};
pub use receiver::IrReceiver;
pub use throttle::Throttle;

use crate::events::IrEvent;
use entry::ListenerEntry;

#[derive(Default)]
struct Arena {
    slots: Vec<Option<ListenerEntry>>,
    live: usize,
}

/// Listener storage shared between a receiver and the dispatcher
#[derive(Default)]
pub(crate) struct Registry {
    arena: Mutex<Arena>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, filter: Filter, throttle: Throttle, callback: Callback) -> ListenerId {
        let mut arena = self.lock();
        let id = ListenerId(arena.slots.len() as u64);
        arena
            .slots
            .push(Some(ListenerEntry::new(id, filter, throttle, callback)));
        arena.live += 1;
        id
    }

    /// Tombstone `id`; false when it was unknown or already removed
    fn remove(&self, id: ListenerId) -> bool {
        let Ok(index) = usize::try_from(id.0) else {
            return false;
        };

        let mut arena = self.lock();
        let removed = arena.slots.get_mut(index).and_then(Option::take).is_some();
        if removed {
            arena.live -= 1;
        }
        removed
    }

    /// Tombstone every live entry, returning how many there were
    fn clear(&self) -> usize {
        let mut arena = self.lock();
        let removed = arena.live;
        arena.slots.iter_mut().for_each(|slot| *slot = None);
        arena.live = 0;
        removed
    }

    fn len(&self) -> usize {
        self.lock().live
    }

    fn infos(&self) -> Vec<ListenerInfo> {
        self.lock().slots.iter().flatten().map(ListenerEntry::info).collect()
    }

    /// Callbacks that fire for `event`, in registration order
    ///
    /// Throttle state is updated here; the callbacks themselves are run by
    /// the caller without holding the lock.
    pub(crate) fn select(&self, event: &IrEvent, now: Instant) -> Vec<(ListenerId, Callback)> {
        self.lock()
            .slots
            .iter_mut()
            .flatten()
            .filter_map(|entry| {
                entry
                    .accept(event, now)
                    .then(|| (entry.id, entry.callback.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn noop() -> Callback {
        Arc::new(|_: &IrEvent| {})
    }

    #[test]
    fn test_ids_are_stable_and_never_reused() {
        let registry = Registry::default();
        let a = registry.insert(Filter::Any, Throttle::Unthrottled, noop());
        let b = registry.insert(Filter::Any, Throttle::Unthrottled, noop());
        assert_ne!(a, b);

        assert!(registry.remove(a));
        let c = registry.insert(Filter::Any, Throttle::Unthrottled, noop());
        assert_ne!(c, a);
        assert_ne!(c, b);

        assert!(!registry.remove(a));
        assert!(!registry.remove(ListenerId(999)));
        assert_eq!(registry.len(), 2);

        let ids: Vec<ListenerId> = registry.infos().iter().map(|info| info.id).collect();
        assert_eq!(ids, vec![b, c]);
    }

    #[test]
    fn test_select_in_registration_order() {
        let registry = Registry::default();
        let left = registry.insert(Filter::key("KEY_LEFT"), Throttle::Unthrottled, noop());
        let _right = registry.insert(Filter::key("KEY_RIGHT"), Throttle::Unthrottled, noop());
        let any = registry.insert(Filter::Any, Throttle::Unthrottled, noop());

        let event = IrEvent::new("0000000000000000", 0, "KEY_LEFT", "remote1");
        let ids: Vec<ListenerId> = registry
            .select(&event, Instant::now())
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![left, any]);
    }

    #[test]
    fn test_clear_tombstones_everything() {
        let registry = Registry::default();
        let a = registry.insert(Filter::Any, Throttle::Unthrottled, noop());
        registry.insert(Filter::Any, Throttle::Unthrottled, noop());
        registry.remove(a);

        assert_eq!(registry.clear(), 1);
        assert_eq!(registry.len(), 0);
        assert!(registry.infos().is_empty());
        assert_eq!(registry.clear(), 0);
    }
}
