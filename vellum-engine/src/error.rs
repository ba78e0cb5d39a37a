//! Error types for vellum-engine.

use std::time::Duration;

use thiserror::Error;

/// All errors that can arise from the rendering engine and its surfaces.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The embedded rendering engine could not be started or reached.
    /// Environment problem; the core never retries on its own.
    #[error("rendering engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    /// A render demand arrived after the manager was shut down.
    #[error("engine manager is shut down")]
    Closed,

    /// The quiescence wait exceeded its bound before styling settled.
    #[error("timed out after {timeout:?} waiting for the surface to quiesce")]
    RenderTimeout { timeout: Duration },

    /// Any other failure while loading or capturing the document.
    #[error("render failed: {reason}")]
    RenderFailed { reason: String },
}

impl EngineError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        EngineError::EngineUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        EngineError::RenderFailed {
            reason: reason.into(),
        }
    }
}
