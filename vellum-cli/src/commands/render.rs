//! `vellum render` — render one template to a PDF file.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{Map, Value};

use vellum_core::{RenderRequest, RenderedDocument, TemplateEngine};
use vellum_engine::{render_document, EngineConfig, EngineManager};
use vellum_transform::Transformer;

/// Arguments for `vellum render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the template content; reads stdin when omitted.
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Template engine the content is authored in.
    #[arg(long, default_value_t = TemplateEngine::Html)]
    pub engine: TemplateEngine,

    /// JSON object file supplying the data context.
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output path; defaults to `<name>.pdf` in the current directory.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Document name used for the default output filename.
    #[arg(long, default_value = "document")]
    pub name: String,

    /// Rendering engine binary (chromium/chrome); discovered on PATH when
    /// omitted.
    #[arg(long, env = "VELLUM_BROWSER")]
    pub browser: Option<PathBuf>,

    /// Upper bound in seconds for the styling-settle wait.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(self.render())
    }

    async fn render(self) -> Result<()> {
        let content = match &self.content {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read template '{}'", path.display()))?,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read template from stdin")?;
                buffer
            }
        };
        let data = match &self.data {
            Some(path) => Some(read_data_context(path)?),
            None => None,
        };

        let request = RenderRequest {
            engine: self.engine,
            content,
            data,
        };

        let manager = EngineManager::new(EngineConfig {
            binary: self.browser.clone(),
            quiescence_timeout: Duration::from_secs(self.timeout_secs),
            ..EngineConfig::default()
        });
        let transformer = Transformer::new();

        tracing::info!(engine = %self.engine, "rendering template");
        let outcome = render_document(&manager, &transformer, &request).await;
        // The engine must never outlive this process, success or not.
        manager.shutdown().await;
        let document = outcome?;

        let out = self
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(RenderedDocument::attachment_filename(&self.name)));
        fs::write(&out, document.as_bytes())
            .with_context(|| format!("failed to write '{}'", out.display()))?;

        println!("✓ wrote {} ({} bytes)", out.display(), document.len());
        Ok(())
    }
}

fn read_data_context(path: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read data context '{}'", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in data context '{}'", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("data context in '{}' must be a JSON object", path.display()),
    }
}
