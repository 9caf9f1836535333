//! Error types for the synchronization engine
//!
//! Construction-time failures (config, resolution, init) abort startup.
//! Write failures are recoverable and only reported. Subscription failures
//! end live hardware synchronization and must reach the operator.

use crate::provider::{ParamId, ParamKind};
use thiserror::Error;

/// Errors reported by a hardware control provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No parameter with this name exists on the device
    #[error("parameter not found: {0}")]
    NotFound(String),

    /// Low-level read/write/subscribe failure
    #[error("I/O error: {0}")]
    Io(String),

    /// The event stream was closed by the provider
    #[error("event stream closed")]
    Closed,
}

/// Which list of a gang definition an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    /// Writable fader parameter
    Control,
    /// Read-only level indicator
    Level,
}

impl std::fmt::Display for EntryRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryRole::Control => write!(f, "control"),
            EntryRole::Level => write!(f, "level"),
        }
    }
}

/// Why a named parameter could not be bound into a gang
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    #[error("not found on hardware: {0}")]
    NotFound(#[source] ProviderError),

    #[error("type {0:?} not supported")]
    UnsupportedKind(ParamKind),

    #[error("parameter is read-only")]
    ReadOnly,
}

/// Errors raised by the synchronization engine
#[derive(Error, Debug, Clone)]
pub enum MixerError {
    /// Malformed or empty gang definition
    #[error("gang '{gang}': {reason}")]
    Config { gang: String, reason: String },

    /// A configured parameter could not be resolved against the device
    #[error("gang {gang_index} ({gang_name}), {role} {entry_index} ({parameter}): {reason}")]
    Resolution {
        gang_index: usize,
        gang_name: String,
        role: EntryRole,
        entry_index: usize,
        parameter: String,
        #[source]
        reason: ResolveFailure,
    },

    /// The initial hardware read of a channel failed
    #[error("failed to read initial value of '{parameter}': {source}")]
    Init {
        parameter: String,
        #[source]
        source: ProviderError,
    },

    /// A UI-originated hardware write failed
    #[error("failed to write {value} to '{parameter}' (id {id}): {source}")]
    Write {
        id: ParamId,
        parameter: String,
        value: i64,
        #[source]
        source: ProviderError,
    },

    /// The hardware change-notification stream failed or closed
    #[error("hardware event stream failed: {0}")]
    Subscription(#[source] ProviderError),
}

impl MixerError {
    pub(crate) fn config(gang: &str, reason: impl Into<String>) -> Self {
        MixerError::Config {
            gang: gang.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type MixerResult<T> = Result<T, MixerError>;
