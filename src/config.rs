//! Configuration loading from the environment

use anyhow::{bail, Context, Result};
use irreceive::{Filter, SpawnStrategy, DEFAULT_PRODUCER};

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Producer program (`IRRECEIVE_PRODUCER`)
    pub producer: String,

    /// Producer arguments (`IRRECEIVE_PRODUCER_ARGS`, whitespace-separated)
    pub producer_args: Vec<String>,

    /// Only report this key (`IRRECEIVE_KEY`)
    pub key: Option<String>,

    /// Only report this remote (`IRRECEIVE_REMOTE`); requires a key
    pub remote: Option<String>,

    /// Hold-repeat throttle in milliseconds (`IRRECEIVE_THROTTLE_MS`)
    pub throttle_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let producer = get("IRRECEIVE_PRODUCER").unwrap_or_else(|| DEFAULT_PRODUCER.to_string());
        let producer_args = get("IRRECEIVE_PRODUCER_ARGS")
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let key = get("IRRECEIVE_KEY");
        let remote = get("IRRECEIVE_REMOTE");
        if remote.is_some() && key.is_none() {
            bail!("IRRECEIVE_REMOTE requires IRRECEIVE_KEY");
        }

        let throttle_ms = get("IRRECEIVE_THROTTLE_MS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .with_context(|| format!("invalid IRRECEIVE_THROTTLE_MS: {value:?}"))
            })
            .transpose()?;

        Ok(Self {
            producer,
            producer_args,
            key,
            remote,
            throttle_ms,
        })
    }

    /// Listener filter for the configured key/remote
    pub fn filter(&self) -> Filter {
        match (&self.key, &self.remote) {
            (Some(key), Some(remote)) => Filter::key_remote(key, remote),
            (Some(key), None) => Filter::key(key),
            _ => Filter::Any,
        }
    }

    /// Spawn strategy running the configured producer
    pub fn spawn_strategy(&self) -> SpawnStrategy {
        SpawnStrategy::command(&self.producer, self.producer_args.iter().cloned())
    }
}
