//! mqbridge CLI
//!
//! Operator tool for checking rule sets, rendering transforms offline and
//! publishing through the configured broker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mqbridge_core::{AppConfig, NoopRecorder, Recorder, TracingRecorder};

mod commands;
mod logging;

/// mqbridge - HTTP to MQTT message transformer
#[derive(Parser)]
#[command(name = "mqbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MQBRIDGE_CONFIG", default_value = "config/app.json")]
    config: PathBuf,

    /// Enable verbose logging and metric traces
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and compile every rule
    Validate,

    /// List loaded rules
    Rules,

    /// Transform a document offline and print the result
    Render {
        /// Rule id
        #[arg(short, long)]
        rule: String,

        /// Input file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// Transform a document and publish it to the rule's topic
    Send {
        /// Rule id
        #[arg(short, long)]
        rule: String,

        /// Input file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// Connect to the broker and report liveness
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    logging::init(&config.logger, cli.verbose).context("Failed to initialize logging")?;

    let recorder: Arc<dyn Recorder> = if cli.verbose {
        Arc::new(TracingRecorder)
    } else {
        Arc::new(NoopRecorder)
    };

    match cli.command {
        Commands::Validate => {
            commands::validate::run(&config, recorder).await?;
        }
        Commands::Rules => {
            commands::rules::run(&config).await?;
        }
        Commands::Render { rule, input } => {
            commands::render::run(&config, &rule, &input, recorder).await?;
        }
        Commands::Send { rule, input } => {
            commands::send::run(&config, &rule, &input, recorder).await?;
        }
        Commands::Ping => {
            commands::ping::run(&config, recorder).await?;
        }
    }

    Ok(())
}
