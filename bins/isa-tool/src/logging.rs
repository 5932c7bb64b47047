use anyhow::Result;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LogLevel;

pub const DEFAULT_LOG_FILE: &str = "isa-tool.log";

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Install the global subscriber.
///
/// `level` of `None` turns logging off unless `RUST_LOG` says otherwise.
/// Console output goes to stderr so it never mixes with command output.
pub fn initialize_logging(
    log_file_path: Option<&str>,
    level: Option<LogLevel>,
    console: bool,
) -> Result<()> {
    if INIT_GUARD.set(()).is_err() {
        return Ok(());
    }

    let file_layer = match log_file_path {
        Some(path) => {
            let log_path = if path.is_empty() {
                std::env::current_dir()?.join(DEFAULT_LOG_FILE)
            } else {
                PathBuf::from(path)
            };
            // Continue without the file if it cannot be created
            std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&log_path)
                .ok()
                .map(|log_file| {
                    tracing_subscriber::fmt::layer()
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(log_file)
                        .with_target(true)
                        .with_ansi(false)
                        .with_filter(build_filter(level))
                })
        }
        None => None,
    };

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(build_filter(level))
    });

    // Ignore AlreadyInit errors from a subscriber installed elsewhere
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    Ok(())
}

fn build_filter(level: Option<LogLevel>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::new("off"),
    }
}
