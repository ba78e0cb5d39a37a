//! Subprocess bridge to the Node.js dialect converters.
//!
//! The converter scripts are embedded at compile time and staged to a
//! scratch directory on first use, so the installed binary has no runtime
//! file dependencies beyond the Node.js executable itself.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use serde_json::{Map, Value};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::OnceCell;

use vellum_core::TemplateEngine;

use crate::error::TransformError;
use crate::escape::escape_argument;

// ---------------------------------------------------------------------------
// Embedded converter scripts
// ---------------------------------------------------------------------------

const JSX_SCRIPT_NAME: &str = "jsx-convert.js";
const VUE_SCRIPT_NAME: &str = "vue-convert.js";

const JSX_CONVERTER: &str = include_str!("scripts/jsx-convert.js");
const VUE_CONVERTER: &str = include_str!("scripts/vue-convert.js");

fn stage_scripts() -> Result<TempDir, TransformError> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join(JSX_SCRIPT_NAME), JSX_CONVERTER)?;
    std::fs::write(dir.path().join(VUE_SCRIPT_NAME), VUE_CONVERTER)?;
    Ok(dir)
}

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

/// A markup dialect with a registered converter script.
///
/// Plain HTML has no entry here on purpose; it never reaches the
/// transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Jsx,
    Vue,
}

impl Dialect {
    /// The transformation path for a template engine, if it has one.
    pub fn for_engine(engine: TemplateEngine) -> Option<Dialect> {
        match engine {
            TemplateEngine::Html => None,
            TemplateEngine::Jsx => Some(Dialect::Jsx),
            TemplateEngine::Vue => Some(Dialect::Vue),
        }
    }

    fn script_name(&self) -> &'static str {
        match self {
            Dialect::Jsx => JSX_SCRIPT_NAME,
            Dialect::Vue => VUE_SCRIPT_NAME,
        }
    }
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

/// Configuration for the converter invocation.
#[derive(Debug, Clone)]
pub struct TransformerConfig {
    /// Node.js executable; resolved through `PATH` when relative.
    pub node_binary: PathBuf,
    /// Directory holding the converter scripts. `None` stages the embedded
    /// scripts to a scratch directory on first use.
    pub script_dir: Option<PathBuf>,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        TransformerConfig {
            node_binary: PathBuf::from("node"),
            script_dir: None,
        }
    }
}

/// Converts dialect markup plus a data context into plain HTML by running
/// the registered converter script out of process.
pub struct Transformer {
    config: TransformerConfig,
    scratch: OnceCell<TempDir>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    /// Transformer using `node` from `PATH` and the embedded scripts.
    pub fn new() -> Self {
        Self::with_config(TransformerConfig::default())
    }

    pub fn with_config(config: TransformerConfig) -> Self {
        Transformer {
            config,
            scratch: OnceCell::new(),
        }
    }

    async fn script_path(&self, dialect: Dialect) -> Result<PathBuf, TransformError> {
        if let Some(dir) = &self.config.script_dir {
            return Ok(dir.join(dialect.script_name()));
        }
        let dir = self
            .scratch
            .get_or_try_init(|| async { stage_scripts() })
            .await?;
        Ok(dir.path().join(dialect.script_name()))
    }

    /// Normalize `markup` in `dialect` against `context` into plain HTML.
    ///
    /// The context is serialized to JSON and passed alongside the escaped
    /// markup as process arguments. The converter prints HTML on stdout;
    /// a non-zero exit is a content error ([`TransformError::TransformFailed`]),
    /// a missing runtime is a deployment error
    /// ([`TransformError::TransformerUnavailable`]).
    pub async fn transform(
        &self,
        dialect: Dialect,
        markup: &str,
        context: Option<&Map<String, Value>>,
    ) -> Result<String, TransformError> {
        let script = self.script_path(dialect).await?;
        let context_json = match context {
            Some(map) => serde_json::to_string(map)?,
            None => "{}".to_string(),
        };
        let escaped = escape_argument(markup);

        tracing::debug!(
            dialect = ?dialect,
            script = %script.display(),
            context_bytes = context_json.len(),
            "invoking dialect converter",
        );

        let output = Command::new(&self.config.node_binary)
            .arg(&script)
            .arg(&escaped)
            .arg(&context_json)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    TransformError::TransformerUnavailable {
                        binary: self.config.node_binary.clone(),
                    }
                } else {
                    TransformError::Spawn {
                        binary: self.config.node_binary.clone(),
                        source: err,
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(dialect = ?dialect, %stderr, "dialect converter reported failure");
            return Err(TransformError::TransformFailed { stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_has_no_dialect() {
        assert_eq!(Dialect::for_engine(TemplateEngine::Html), None);
        assert_eq!(Dialect::for_engine(TemplateEngine::Jsx), Some(Dialect::Jsx));
        assert_eq!(Dialect::for_engine(TemplateEngine::Vue), Some(Dialect::Vue));
    }

    #[test]
    fn dialects_use_distinct_scripts() {
        assert_ne!(Dialect::Jsx.script_name(), Dialect::Vue.script_name());
    }

    #[test]
    fn embedded_scripts_stage_to_scratch_dir() {
        let dir = stage_scripts().expect("stage scripts");
        for name in [JSX_SCRIPT_NAME, VUE_SCRIPT_NAME] {
            let path = dir.path().join(name);
            let contents = std::fs::read_to_string(&path).expect("script staged");
            assert!(
                contents.contains("process.stdout.write"),
                "{name} should print converted HTML on stdout"
            );
        }
    }

    #[tokio::test]
    async fn missing_runtime_is_unavailable_not_failed() {
        let transformer = Transformer::with_config(TransformerConfig {
            node_binary: PathBuf::from("/nonexistent/vellum-node"),
            script_dir: None,
        });
        let err = transformer
            .transform(Dialect::Jsx, "<p>{x}</p>", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::TransformerUnavailable { .. }));
    }
}
