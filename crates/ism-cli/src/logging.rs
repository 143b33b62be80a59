//! Logging setup with `tracing` and `tracing-subscriber`.
//!
//! Library crates only emit events; the binary decides where they go.
//!
//! # Log Levels
//!
//! - `error`: invariant violations such as a failed mapping round trip
//! - `warn`: failed calls, danger toasts, skipped malformed rows
//! - `info`: loads and saves, success toasts
//! - `debug`: field and editor state transitions
//! - `trace`: field registration and dropped validation results

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Crates whose events follow the configured level. Others stay at warn.
const OWN_CRATES: &[&str] = &[
    "ism",
    "ism_cli",
    "ism_form",
    "ism_mapping",
    "ism_model",
    "ism_service",
];

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level for the index management crates.
    pub level_filter: LevelFilter,
    /// Whether `RUST_LOG` may replace the configured filter.
    pub use_env_filter: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Append to this file instead of stderr. File output carries
    /// timestamps.
    pub log_file: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let writer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::stderr),
    };
    tracing_subscriber::registry()
        .with(build_env_filter(config))
        .with(output_layer(config, writer))
        .init();
    Ok(())
}

fn output_layer<S>(config: &LogConfig, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let timed = config.log_file.is_some();
    let ansi = config.with_ansi && !timed;
    match config.format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(false);
            if timed { layer.boxed() } else { layer.without_time().boxed() }
        }
        LogFormat::Pretty => {
            let layer = fmt::layer().with_writer(writer).with_ansi(ansi).with_target(false);
            if timed { layer.boxed() } else { layer.without_time().boxed() }
        }
    }
}

/// Filter directives for `level` on our crates, warn elsewhere.
pub fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let fallback = || EnvFilter::new(default_directives(config.level_filter));
    if config.use_env_filter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
    } else {
        fallback()
    }
}
