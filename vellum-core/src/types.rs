//! Domain types for the Vellum render pipeline.
//!
//! A [`Template`] is the stored form of a document; a [`RenderRequest`] is
//! the per-invocation payload resolved from it. Both carry their data
//! context as plain JSON so it can cross the process boundary to the
//! dialect transformer unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Media type of every rendered document.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

// ---------------------------------------------------------------------------
// Template engine
// ---------------------------------------------------------------------------

/// The markup dialect a template is authored in.
///
/// `Html` renders as-is; `Jsx` and `Vue` are normalized to plain HTML by the
/// out-of-process transformer before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngine {
    #[default]
    Html,
    Jsx,
    Vue,
}

impl TemplateEngine {
    /// All engine variants in a stable order.
    pub fn all() -> &'static [TemplateEngine] {
        &[TemplateEngine::Html, TemplateEngine::Jsx, TemplateEngine::Vue]
    }

    /// Whether templates in this dialect must pass through the transformer.
    pub fn needs_transform(&self) -> bool {
        !matches!(self, TemplateEngine::Html)
    }
}

impl fmt::Display for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateEngine::Html => write!(f, "html"),
            TemplateEngine::Jsx => write!(f, "jsx"),
            TemplateEngine::Vue => write!(f, "vue"),
        }
    }
}

impl FromStr for TemplateEngine {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(TemplateEngine::Html),
            "jsx" => Ok(TemplateEngine::Jsx),
            "vue" => Ok(TemplateEngine::Vue),
            other => Err(CoreError::UnknownEngine(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A stored template record, consumed read-only by the render pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Human-facing template name; feeds the attachment filename hint.
    pub name: String,
    pub engine: TemplateEngine,
    /// Markup/source text in the dialect implied by `engine`.
    pub content: String,
    /// Data context available to the template at transform time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// One render invocation: engine, content, and data context.
///
/// Ephemeral: built per call from a [`Template`] or directly from a caller
/// payload, validated once, then consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub engine: TemplateEngine,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl RenderRequest {
    /// Build a request from a stored template, with `data` overriding the
    /// template's own context when supplied.
    pub fn from_template(template: &Template, data: Option<Map<String, Value>>) -> Self {
        RenderRequest {
            engine: template.engine,
            content: template.content.clone(),
            data: data.or_else(|| template.data.clone()),
        }
    }

    /// Reject requests with nothing to render. Runs before any engine or
    /// transformer interaction.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.content.trim().is_empty() {
            return Err(CoreError::EmptyContent);
        }
        Ok(())
    }
}

/// A finished, paginated document. Produced once per request; ownership
/// passes to the caller immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        RenderedDocument { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Filename hint for attachment-style delivery, e.g. `invoice.pdf`.
    pub fn attachment_filename(stem: &str) -> String {
        format!("{stem}.pdf")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
