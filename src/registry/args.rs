//! Listener registration descriptors
//!
//! [`Registration`] is the typed way to describe a listener.
//! [`classify`] resolves the positional call shape
//! `[key] [remote] callback [throttle_ms] ...` into one.

use std::fmt;
use std::sync::Arc;

use super::entry::{Callback, Filter};
use super::throttle::Throttle;
use crate::error::ArgumentError;
use crate::events::IrEvent;

/// Most filter strings allowed before the callback
const MAX_FILTERS: usize = 2;

/// One positional argument of [`IrReceiver::add_listener`](crate::IrReceiver::add_listener)
#[derive(Clone)]
pub enum ListenerArg {
    /// A key or remote name
    Str(String),
    /// The listener callback
    Callback(Callback),
    /// A throttle in milliseconds
    Number(i64),
    /// Anything else; never valid in a recognized position
    Other,
}

impl ListenerArg {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&IrEvent) + Send + Sync + 'static,
    {
        ListenerArg::Callback(Arc::new(f))
    }
}

impl From<&str> for ListenerArg {
    fn from(s: &str) -> Self {
        ListenerArg::Str(s.to_string())
    }
}

impl From<String> for ListenerArg {
    fn from(s: String) -> Self {
        ListenerArg::Str(s)
    }
}

impl From<i64> for ListenerArg {
    fn from(n: i64) -> Self {
        ListenerArg::Number(n)
    }
}

impl From<Callback> for ListenerArg {
    fn from(callback: Callback) -> Self {
        ListenerArg::Callback(callback)
    }
}

impl fmt::Debug for ListenerArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerArg::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ListenerArg::Callback(_) => f.write_str("Callback(..)"),
            ListenerArg::Number(n) => f.debug_tuple("Number").field(n).finish(),
            ListenerArg::Other => f.write_str("Other"),
        }
    }
}

/// Everything needed to register one listener
#[derive(Clone)]
pub struct Registration {
    key: Option<String>,
    remote: Option<String>,
    throttle_ms: Option<u64>,
    callback: Callback,
}

impl Registration {
    /// Listener for every event, unthrottled
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&IrEvent) + Send + Sync + 'static,
    {
        Self::from_callback(Arc::new(callback))
    }

    pub fn from_callback(callback: Callback) -> Self {
        Self {
            key: None,
            remote: None,
            throttle_ms: None,
            callback,
        }
    }

    /// Only events for `key`
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Only events from `remote`; requires a key
    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Apply an existing filter
    pub fn filter(mut self, filter: Filter) -> Self {
        (self.key, self.remote) = match filter {
            Filter::Any => (None, None),
            Filter::Key { key } => (Some(key), None),
            Filter::KeyRemote { key, remote } => (Some(key), Some(remote)),
        };
        self
    }

    /// Throttle hold-repeats: 0 fires once per hold, N at most once per N ms
    pub fn throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.throttle_ms = Some(throttle_ms);
        self
    }

    pub(crate) fn into_parts(self) -> Result<(Filter, Throttle, Callback), ArgumentError> {
        let filter = match (self.key, self.remote) {
            (None, None) => Filter::Any,
            (Some(key), None) => Filter::Key { key },
            (Some(key), Some(remote)) => Filter::KeyRemote { key, remote },
            (None, Some(_)) => return Err(ArgumentError::RemoteWithoutKey),
        };
        Ok((filter, Throttle::from_millis(self.throttle_ms), self.callback))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("remote", &self.remote)
            .field("throttle_ms", &self.throttle_ms)
            .finish_non_exhaustive()
    }
}

/// Resolve a positional call shape into a registration
///
/// The first callback splits the arguments: up to two strings may precede
/// it (key, then remote), and the argument right after it, if any, must be
/// a non-negative throttle. Anything further is ignored.
pub fn classify(args: &[ListenerArg]) -> Result<Registration, ArgumentError> {
    let callback_at = args
        .iter()
        .position(|arg| matches!(arg, ListenerArg::Callback(_)))
        .ok_or(ArgumentError::MissingCallback)?;

    if callback_at > MAX_FILTERS {
        return Err(ArgumentError::TooManyFilters { found: callback_at });
    }

    let mut filters = Vec::with_capacity(callback_at);
    for (position, arg) in args[..callback_at].iter().enumerate() {
        match arg {
            ListenerArg::Str(s) => filters.push(s.clone()),
            _ => return Err(ArgumentError::UnexpectedArgument { position }),
        }
    }

    let throttle_at = callback_at + 1;
    let throttle_ms = match args.get(throttle_at) {
        None => None,
        Some(ListenerArg::Number(ms)) => Some(
            u64::try_from(*ms).map_err(|_| ArgumentError::InvalidThrottle {
                position: throttle_at,
            })?,
        ),
        Some(_) => {
            return Err(ArgumentError::InvalidThrottle {
                position: throttle_at,
            })
        }
    };

    let ListenerArg::Callback(callback) = &args[callback_at] else {
        return Err(ArgumentError::MissingCallback);
    };

    let mut filters = filters.into_iter();
    Ok(Registration {
        key: filters.next(),
        remote: filters.next(),
        throttle_ms,
        callback: Arc::clone(callback),
    })
}
