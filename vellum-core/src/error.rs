//! Error types for vellum-core.

use thiserror::Error;

/// All errors that can arise from request construction and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request carried no renderable content. Caught before any engine
    /// or transformer interaction.
    #[error("template content is empty; nothing to render")]
    EmptyContent,

    /// The caller asked for a template engine this build does not know.
    #[error("unknown template engine '{0}'; expected: html, jsx, vue")]
    UnknownEngine(String),
}
