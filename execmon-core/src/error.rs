//! Error types for the monitor core

use execmon_types::{ReactorName, Tick, TokenKey, ViewKind};
use std::path::PathBuf;
use thiserror::Error;

/// Invalid filter expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid filter pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Entity model construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Reactor key '{key}' does not match core reactor '{core}'")]
    ReactorMismatch { key: ReactorName, core: ReactorName },
}

/// Errors raised at the trace reader boundary
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("No trace data at tick {0}")]
    TickOutOfRange(Tick),

    #[error("Invalid tick '{0}'")]
    InvalidTick(String),

    #[error("Failed to open trace log at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed trace: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised while running a context action or a listener
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("No action '{action}' registered on the {view} view")]
    UnknownAction { view: ViewKind, action: String },

    #[error("Token '{key}' is not in the assembly of '{reactor}'")]
    UnknownToken { reactor: ReactorName, key: TokenKey },

    #[error("Token '{0}' is not in the token network")]
    UnknownNode(TokenKey),

    #[error("Reactor '{0}' is not in the current entity set")]
    UnknownReactor(ReactorName),

    #[error("Action '{action}' expects a {expected} context")]
    WrongContext {
        action: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Listener dispatch failures
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Listener failed: {0}")]
    Listener(#[source] Box<ActionError>),

    #[error("{} listener(s) failed", .0.len())]
    Collected(Vec<ActionError>),

    #[error("publish called from inside a listener of the same registry")]
    Reentrant,
}

/// Top-level error for embedders
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Result type using ActionError
pub type ActionResult<T> = std::result::Result<T, ActionError>;

/// Result type using MonitorError
pub type Result<T> = std::result::Result<T, MonitorError>;
