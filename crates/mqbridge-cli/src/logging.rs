//! Tracing subscriber setup from the `logger` config section

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use mqbridge_core::config::{LogEncoding, LoggerConfig};
use mqbridge_core::metrics::METRICS_TARGET;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `--verbose`, which wins over `logger.level`.
pub fn init(config: &LoggerConfig, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(config, verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match config.output_path.as_str() {
        "" | "stdout" => BoxMakeWriter::new(std::io::stdout),
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        path => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path}"))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    let layer = match config.encoding {
        LogEncoding::Console => layer.boxed(),
        LogEncoding::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Filter directives without `RUST_LOG`. Verbose mode also enables the
/// metric trace events.
fn directives(config: &LoggerConfig, verbose: bool) -> String {
    if verbose {
        format!("debug,{METRICS_TARGET}=trace")
    } else {
        config.level.clone()
    }
}
