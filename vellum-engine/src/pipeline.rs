//! Canonical render entrypoint shared by the CLI and any embedding host.

use thiserror::Error;

use vellum_core::{CoreError, RenderRequest, RenderedDocument};
use vellum_transform::{TransformError, Transformer};

use crate::compose::compose;
use crate::error::EngineError;
use crate::manager::EngineManager;

/// Boundary error for a whole render: every failure kind a caller can see,
/// each carrying a human-readable cause.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render request: {0}")]
    Validation(#[from] CoreError),

    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Render one request to a finished document.
///
/// Validation runs before any engine or transformer interaction; composition
/// runs before the engine is acquired, so content problems never cost an
/// engine startup. No retries anywhere; the caller decides what is worth
/// retrying based on the error kind.
pub async fn render_document(
    manager: &EngineManager,
    transformer: &Transformer,
    request: &RenderRequest,
) -> Result<RenderedDocument, RenderError> {
    request.validate()?;
    let markup = compose(request, transformer).await?;
    let session = manager.acquire().await?;
    let bytes = session.render(&markup).await?;
    tracing::debug!(engine = %request.engine, bytes = bytes.len(), "document rendered");
    Ok(RenderedDocument::new(bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
