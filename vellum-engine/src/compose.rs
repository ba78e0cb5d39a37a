//! Document composition: engine-kind dispatch plus the document shell.

use vellum_core::RenderRequest;
use vellum_transform::{Dialect, TransformError, Transformer};

/// Styling runtime injected into every document. It compiles class-based
/// styling rules asynchronously after load, which is why the session must
/// wait for network quiescence before capture.
const STYLE_RUNTIME_SRC: &str = "https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4";

/// Resolve a request to final document markup.
///
/// Plain HTML passes through untouched; dialect content is normalized by
/// the transformer first. The result is always a complete document. Pure
/// apart from the transformer call: identical requests compose to identical
/// markup.
pub async fn compose(
    request: &RenderRequest,
    transformer: &Transformer,
) -> Result<String, TransformError> {
    let body = match Dialect::for_engine(request.engine) {
        None => request.content.clone(),
        Some(dialect) => {
            transformer
                .transform(dialect, &request.content, request.data.as_ref())
                .await?
        }
    };
    Ok(document_shell(&body))
}

/// Wrap body markup in the minimal document shell: charset, responsive
/// viewport, styling-runtime bootstrap.
pub fn document_shell(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <script src="{STYLE_RUNTIME_SRC}"></script>
    <style type="text/tailwindcss"></style>
  </head>
  <body>
{body}
  </body>
</html>
"#
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
