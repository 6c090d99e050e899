//! Engine error type.
//!
//! Only three conditions are fatal: a corrupt audio asset (fatal to that track
//! alone), a device that fails to come up (fatal to startup) and a hook that
//! returns an error (fatal to the loop). Everything else the engine treats as a
//! no-op.

use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An audio asset could not be read or decoded.
    #[error("Failed to decode '{path}': {reason}")]
    Decode { path: String, reason: String },

    /// The renderer, window or audio device failed to initialize.
    #[error("Device initialization failed: {0}")]
    DeviceInit(String),

    /// The configuration file could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An entity hook returned an error; the frame loop stops.
    #[error("Entity hook '{hook}' failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A resource was requested before the devices exist (e.g. from `init`).
    #[error("Devices are not available yet: {0}")]
    NotReady(&'static str),

    /// IO error from the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for a [`EngineError::Decode`] built from any displayable reason.
    pub fn decode(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        EngineError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
