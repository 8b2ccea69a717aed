//! Producer module: the shared external process emitting button reports
//!
//! The functions here act on the process-wide producer shared by every
//! [`IrReceiver`](crate::IrReceiver). Registries drive the lifecycle
//! through `acquire`/`release_one`; the rest are administrative hooks.

mod manager;
mod reader;
mod spawn;

pub(crate) use manager::ExitWatcher;
pub use manager::ProducerHandle;
pub use spawn::{CommandProducer, Producer, SpawnStrategy, DEFAULT_PRODUCER};

use std::sync::Weak;

use crate::error::IrError;
use manager::manager;

/// Return the running producer, spawning it if none is running
pub fn ensure_started() -> Result<ProducerHandle, IrError> {
    manager().ensure_started()
}

/// Kill the running producer, if any. Listener counts are left untouched.
pub fn force_kill() {
    manager().force_kill()
}

/// Handle of the running producer
pub fn current() -> Option<ProducerHandle> {
    manager().current()
}

/// Number of live listeners across every registry
pub fn live_listeners() -> usize {
    manager().live_listeners()
}

/// Replace the strategy used for the next spawn
pub fn set_spawn_strategy(strategy: SpawnStrategy) {
    manager().set_spawn_strategy(strategy)
}

/// Restore the default strategy (run `irw`)
pub fn reset_spawn_strategy() {
    manager().set_spawn_strategy(SpawnStrategy::default())
}

pub(crate) fn acquire() -> Result<ProducerHandle, IrError> {
    manager().acquire()
}

pub(crate) fn release_one() {
    manager().release_one()
}

pub(crate) fn is_current(generation: u64) -> bool {
    manager().is_current(generation)
}

pub(crate) fn watch_exit(generation: u64, watcher: Weak<dyn ExitWatcher>) -> bool {
    manager().watch_exit(generation, watcher)
}
