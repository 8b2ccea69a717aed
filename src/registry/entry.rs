//! Listener entries and their filters

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::throttle::{Throttle, ThrottleTracker};
use crate::events::IrEvent;

/// Callback invoked with each matching event
pub type Callback = Arc<dyn Fn(&IrEvent) + Send + Sync>;

/// Identifier of a listener within its registry
///
/// Never reused, and stays valid for `remove_listener` after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which events a listener receives
///
/// A remote can only be matched together with a key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum Filter {
    /// Every event
    #[default]
    Any,
    /// Events for this key, from any remote
    Key { key: String },
    /// Events for this key from this remote
    KeyRemote { key: String, remote: String },
}

impl Filter {
    pub fn key(key: impl Into<String>) -> Self {
        Filter::Key { key: key.into() }
    }

    pub fn key_remote(key: impl Into<String>, remote: impl Into<String>) -> Self {
        Filter::KeyRemote {
            key: key.into(),
            remote: remote.into(),
        }
    }

    /// Check if `event` passes this filter
    pub fn matches(&self, event: &IrEvent) -> bool {
        match self {
            Filter::Any => true,
            Filter::Key { key } => *key == event.key,
            Filter::KeyRemote { key, remote } => *key == event.key && *remote == event.remote,
        }
    }
}

/// Read-only view of a live listener, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub filter: Filter,
    pub throttle_ms: Option<u64>,
}

pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) filter: Filter,
    pub(crate) callback: Callback,
    tracker: ThrottleTracker,
}

impl ListenerEntry {
    pub(crate) fn new(id: ListenerId, filter: Filter, throttle: Throttle, callback: Callback) -> Self {
        Self {
            id,
            filter,
            callback,
            tracker: ThrottleTracker::new(throttle),
        }
    }

    /// Match and throttle `event`; true when the callback should run
    pub(crate) fn accept(&mut self, event: &IrEvent, now: Instant) -> bool {
        self.filter.matches(event) && self.tracker.should_fire(event, now)
    }

    pub(crate) fn info(&self) -> ListenerInfo {
        ListenerInfo {
            id: self.id,
            filter: self.filter.clone(),
            throttle_ms: self.tracker.throttle().as_millis(),
        }
    }
}
