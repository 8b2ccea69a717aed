//! Process-wide producer lifecycle
//!
//! One producer runs at most, shared by every registry. The manager counts
//! live listeners across all registries: the first acquisition spawns the
//! producer, the release bringing the count back to zero kills it.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::{error, info, warn};

use super::reader;
use super::spawn::{Producer, SpawnStrategy};
use crate::error::IrError;

/// Identifies one spawned producer
///
/// Two handles compare equal only when they refer to the same spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerHandle {
    generation: u64,
    pid: Option<u32>,
}

impl ProducerHandle {
    /// Sequence number of the spawn, unique for the life of the process
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// OS process id, when the producer is a real process
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Told when the producer it watches exits on its own
///
/// Kills issued through the manager (last release, `force_kill`) do not
/// notify watchers.
pub(crate) trait ExitWatcher: Send + Sync {
    fn producer_exited(&self, handle: ProducerHandle);
}

struct RunningProducer {
    handle: ProducerHandle,
    producer: Box<dyn Producer>,
}

struct ManagerState {
    running: Option<RunningProducer>,
    live_listeners: usize,
    spawner: SpawnStrategy,
    next_generation: u64,
    watchers: Vec<Weak<dyn ExitWatcher>>,
}

impl ManagerState {
    fn runs(&self, generation: u64) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| running.handle.generation == generation)
    }
}

pub(crate) struct ProducerManager {
    state: Mutex<ManagerState>,
}

/// The process-wide manager
pub(crate) fn manager() -> &'static ProducerManager {
    static MANAGER: OnceLock<ProducerManager> = OnceLock::new();
    MANAGER.get_or_init(ProducerManager::new)
}

impl ProducerManager {
    fn new() -> Self {
        Self {
            state: Mutex::new(ManagerState {
                running: None,
                live_listeners: 0,
                spawner: SpawnStrategy::default(),
                next_generation: 1,
                watchers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the running producer, spawning one if needed
    pub(crate) fn ensure_started(&self) -> Result<ProducerHandle, IrError> {
        let mut state = self.lock();
        Self::start_locked(&mut state)
    }

    /// Start (if needed) and count one more live listener
    ///
    /// The count only changes when a producer is running afterwards.
    pub(crate) fn acquire(&self) -> Result<ProducerHandle, IrError> {
        let mut state = self.lock();
        let handle = Self::start_locked(&mut state)?;
        state.live_listeners += 1;
        Ok(handle)
    }

    /// Count one listener fewer; kill the producer when none remain
    pub(crate) fn release_one(&self) {
        let mut state = self.lock();
        if state.live_listeners == 0 {
            warn!("listener released with no live listeners");
            return;
        }

        state.live_listeners -= 1;
        if state.live_listeners == 0 {
            Self::kill_locked(&mut state, "no live listeners");
        }
    }

    pub(crate) fn force_kill(&self) {
        let mut state = self.lock();
        Self::kill_locked(&mut state, "forced");
    }

    pub(crate) fn current(&self) -> Option<ProducerHandle> {
        self.lock().running.as_ref().map(|running| running.handle)
    }

    pub(crate) fn live_listeners(&self) -> usize {
        self.lock().live_listeners
    }

    pub(crate) fn set_spawn_strategy(&self, spawner: SpawnStrategy) {
        info!(strategy = spawner.label(), "spawn strategy set");
        self.lock().spawner = spawner;
    }

    /// Check whether `generation` is still the running producer
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock().runs(generation)
    }

    /// Notify `watcher` when producer `generation` exits on its own
    ///
    /// Returns false, registering nothing, when that producer is already gone.
    pub(crate) fn watch_exit(&self, generation: u64, watcher: Weak<dyn ExitWatcher>) -> bool {
        let mut state = self.lock();
        if !state.runs(generation) {
            return false;
        }
        state.watchers.retain(|watcher| watcher.strong_count() > 0);
        state.watchers.push(watcher);
        true
    }

    /// Forget a producer whose output has closed, so the next
    /// acquisition spawns a fresh one, then notify its watchers.
    /// Stale generations are ignored.
    pub(crate) fn producer_exited(&self, generation: u64) {
        let mut state = self.lock();
        let Some(handle) = state
            .running
            .as_ref()
            .map(|running| running.handle)
            .filter(|handle| handle.generation == generation)
        else {
            return;
        };

        warn!(
            generation,
            live_listeners = state.live_listeners,
            "producer output closed"
        );
        let watchers = std::mem::take(&mut state.watchers);
        Self::kill_locked(&mut state, "output closed");
        drop(state);

        for watcher in watchers.iter().filter_map(Weak::upgrade) {
            watcher.producer_exited(handle);
        }
    }

    fn start_locked(state: &mut ManagerState) -> Result<ProducerHandle, IrError> {
        if let Some(running) = &state.running {
            return Ok(running.handle);
        }

        let program = state.spawner.label().to_string();
        let mut producer = state.spawner.spawn().map_err(|source| {
            error!(%program, error = %source, "failed to spawn producer");
            IrError::Spawn {
                program: program.clone(),
                source,
            }
        })?;

        let Some(output) = producer.take_output() else {
            let _ = producer.kill();
            let err = IrError::MissingOutput { program };
            error!(error = err.as_label(), "producer has no output stream");
            return Err(err);
        };

        let generation = state.next_generation;
        state.next_generation += 1;

        // The reader blocks on this lock until `running` is set below
        if let Err(e) = reader::spawn_reader(generation, output) {
            let _ = producer.kill();
            return Err(IrError::ReaderThread(e));
        }

        let handle = ProducerHandle {
            generation,
            pid: producer.pid(),
        };
        info!(generation, pid = ?handle.pid, %program, "producer started");

        state.running = Some(RunningProducer { handle, producer });
        Ok(handle)
    }

    fn kill_locked(state: &mut ManagerState, reason: &str) {
        let Some(mut running) = state.running.take() else {
            return;
        };
        state.watchers.clear();

        let generation = running.handle.generation;
        match running.producer.kill() {
            Ok(()) => info!(generation, reason, "producer stopped"),
            Err(e) => warn!(generation, reason, error = %e, "failed to kill producer"),
        }
    }
}
