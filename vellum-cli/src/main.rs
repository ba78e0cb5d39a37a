//! Vellum — template-to-PDF rendering CLI.
//!
//! # Usage
//!
//! ```text
//! vellum render --content invoice.html --out invoice.pdf
//! vellum render --engine jsx --content invoice.jsx --data context.json -o invoice.pdf
//! cat page.html | vellum render --name page
//! vellum engines
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::render::RenderArgs;
use vellum_core::TemplateEngine;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "vellum",
    version,
    about = "Render markup templates into paginated PDF documents",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template plus data context into a PDF file.
    Render(RenderArgs),

    /// List the supported template engines.
    Engines,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => args.run(),
        Commands::Engines => {
            for engine in TemplateEngine::all() {
                println!("{engine}");
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
