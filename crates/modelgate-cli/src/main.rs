//! ModelGate CLI - routed and validated LLM calls from the shell
//!
//! # Usage
//!
//! ```bash
//! # One call to a catalog model
//! modelgate simple gpt4o "What is the capital of France?" --cost
//!
//! # Consensus-then-verify call against a vendor
//! modelgate checked gemini "What is the capital of France?" --cost
//!
//! # Inspect the catalog (no API keys needed)
//! modelgate models
//! modelgate describe claude3haiku
//!
//! # Environment overrides
//! MODELGATE__REQUEST__TIMEOUT_SECS=30 modelgate simple gpt4omini "Hi"
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use modelgate_llm::{GatewayConfig, LoggingConfig};

mod commands;
mod display;

use commands::{call, catalog};

/// ModelGate - one interface to OpenAI, Anthropic and Gemini
#[derive(Parser)]
#[command(name = "modelgate")]
#[command(author = "ModelGate Contributors")]
#[command(version)]
#[command(about = "Routed and validated LLM calls across vendors", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, global = true, env = "MODELGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MODELGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, global = true, env = "MODELGATE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Single call to a catalog model
    Simple {
        /// Catalog model name (e.g. gpt4o, claude3haiku, gemini25flash)
        model: String,

        /// Prompt text
        prompt: String,

        /// Report the call cost
        #[arg(long)]
        cost: bool,

        /// System message
        #[arg(short, long)]
        system: Option<String>,

        /// Sampling temperature (0.0-2.0); configured default when unset
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Maximum output tokens
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validated call: three high-model samples verified by a budget model
    Checked {
        /// Vendor name (OpenAI, Anthropic, Gemini)
        vendor: String,

        /// Prompt text
        prompt: String,

        /// Report the accumulated cost
        #[arg(long)]
        cost: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List catalog models grouped by vendor
    Models,

    /// Show a catalog entry
    Describe {
        /// Catalog model name
        model: String,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(&config.logging)?;

    tracing::debug!(
        catalog = ?config.models.catalog_path,
        timeout_secs = config.request.timeout_secs,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Simple {
            model,
            prompt,
            cost,
            system,
            temperature,
            max_tokens,
            json,
        } => {
            let options = call::SimpleOptions {
                cost,
                system,
                temperature,
                max_tokens,
                json,
            };
            call::run_simple(&config, &model, &prompt, options).await?;
        }
        Commands::Checked {
            vendor,
            prompt,
            cost,
            json,
        } => {
            call::run_checked(&config, &vendor, &prompt, cost, json).await?;
        }
        Commands::Models => catalog::list_models(&config)?,
        Commands::Describe { model } => catalog::describe(&config, &model)?,
    }

    Ok(())
}

// =============================================================================
// Logging
// =============================================================================

/// Initialize logging; events go to stderr so stdout stays parseable.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
