//! Error types for vellum-transform.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from dialect transformation.
///
/// `TransformerUnavailable` is a deployment problem (the external runtime is
/// missing); `TransformFailed` is a content problem (the runtime ran and
/// rejected this template). Callers route them differently, so they stay
/// distinct variants.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The external converter runtime could not be located.
    #[error("transformer runtime '{binary}' not found; install Node.js or point the transformer at one")]
    TransformerUnavailable { binary: PathBuf },

    /// The converter process could not be started for a reason other than a
    /// missing binary (permissions, resource exhaustion).
    #[error("failed to invoke transformer '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran and reported an error for this template.
    #[error("dialect transformation failed: {stderr}")]
    TransformFailed { stderr: String },

    /// The data context could not be serialized to JSON.
    #[error("failed to serialize data context: {0}")]
    Context(#[from] serde_json::Error),

    /// Converter scripts could not be staged to the scratch directory.
    #[error("failed to stage converter scripts: {0}")]
    Scripts(#[from] std::io::Error),
}
