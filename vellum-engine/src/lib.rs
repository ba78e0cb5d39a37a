//! # vellum-engine
//!
//! The rendering engine half of the pipeline: document composition, the
//! shared headless-browser session, its lifecycle manager, and the
//! [`render_document`] entrypoint.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vellum_core::{RenderRequest, TemplateEngine};
//! use vellum_engine::{render_document, EngineConfig, EngineManager};
//! use vellum_transform::Transformer;
//!
//! async fn render_one() {
//!     let manager = EngineManager::new(EngineConfig::default());
//!     let transformer = Transformer::new();
//!     let request = RenderRequest {
//!         engine: TemplateEngine::Html,
//!         content: "<h1>Invoice</h1>".to_string(),
//!         data: None,
//!     };
//!     if let Ok(document) = render_document(&manager, &transformer, &request).await {
//!         println!("{} bytes", document.len());
//!     }
//!     manager.shutdown().await;
//! }
//! ```

mod cdp;
pub mod compose;
pub mod config;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod session;

pub use compose::{compose, document_shell};
pub use config::{EngineConfig, DEFAULT_QUIESCENCE_TIMEOUT, DEFAULT_STARTUP_TIMEOUT};
pub use error::EngineError;
pub use manager::{EngineManager, EngineState};
pub use pipeline::{render_document, RenderError};
pub use session::EngineSession;
