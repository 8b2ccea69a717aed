//! Error types for listener registration and producer management

use std::io;

/// Errors returned by registration and producer lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    #[error("invalid listener arguments: {0}")]
    InvalidArguments(#[from] ArgumentError),

    #[error("failed to spawn producer `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("producer `{program}` exposes no output stream")]
    MissingOutput { program: String },

    #[error("failed to start producer reader thread")]
    ReaderThread(#[source] io::Error),
}

/// Why a listener call shape could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("no callback given")]
    MissingCallback,

    #[error("at most two filters (key, remote) may precede the callback, found {found}")]
    TooManyFilters { found: usize },

    #[error("argument {position} must be a key or remote name")]
    UnexpectedArgument { position: usize },

    #[error("argument {position} must be a non-negative throttle in milliseconds")]
    InvalidThrottle { position: usize },

    #[error("a remote filter requires a key filter")]
    RemoteWithoutKey,
}

impl IrError {
    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            IrError::InvalidArguments(_) => "invalid_arguments",
            IrError::Spawn { .. } => "spawn_failed",
            IrError::MissingOutput { .. } => "missing_output",
            IrError::ReaderThread(_) => "reader_thread",
        }
    }
}
