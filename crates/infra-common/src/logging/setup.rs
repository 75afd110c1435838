use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use super::formatter::AppLogFormatter;
use crate::errors::{Error, Result};

/// Configuration for the logging system
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` directives still apply on top
    pub level: String,
    /// Whether to enable JSON formatting on the console
    pub json: bool,
    /// Whether to log span enter/exit
    pub log_spans: bool,
    /// Also write log lines to a file in this directory
    pub log_dir: Option<PathBuf>,
    /// Log file name prefix, e.g. `app_20240501_091502.log`
    pub file_prefix: String,
    /// Application name to include in logs
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
            log_spans: false,
            log_dir: None,
            file_prefix: "app".to_string(),
            app_name: "roomkit".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new(level: impl Into<String>, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level: level.into(),
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable JSON formatting
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Enable span logging
    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// File the current run logs to, if file logging is enabled
    pub fn log_file_name(&self) -> String {
        format!("{}_{}.log", self.file_prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"))
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Set up the logging system with the provided configuration
///
/// Console lines use [`AppLogFormatter`] (or JSON). With a `log_dir` the same
/// lines also go to a file through a non-blocking writer; keep the returned
/// guard alive until exit so buffered lines get flushed.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.json {
        layers.push(Box::new(
            fmt::layer()
                .json()
                .with_span_events(span_events.clone())
                .with_writer(std::io::stdout),
        ));
    } else {
        layers.push(Box::new(
            fmt::layer()
                .with_span_events(span_events.clone())
                .event_format(AppLogFormatter::new())
                .with_writer(std::io::stdout),
        ));
    }

    let guard = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, config.log_file_name());
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(Box::new(
                fmt::layer()
                    .with_span_events(span_events)
                    .event_format(AppLogFormatter::new())
                    .with_ansi(false)
                    .with_writer(writer),
            ));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Initialization(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

/// Parse a log level from a string
///
/// Accepts the `tracing` level names plus `verbose` for `trace`.
pub fn parse_log_level(level: &str) -> Result<Level> {
    if level.eq_ignore_ascii_case("verbose") {
        return Ok(Level::TRACE);
    }
    Level::from_str(level).map_err(|_| Error::Config(format!("Invalid log level: {}", level)))
}

/// Log a welcome message with version info
pub fn log_welcome(app_name: &str, version: &str) {
    tracing::info!("Starting {} v{}", app_name, version);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("verbose").unwrap(), Level::TRACE);
        assert!(matches!(parse_log_level("loud"), Err(Error::Config(_))));
    }

    #[test]
    fn test_log_file_name() {
        let name = LoggingConfig::default().log_file_name();
        assert!(name.starts_with("app_"));
        assert!(name.ends_with(".log"));
        // app_yyyyMMdd_HHmmss.log
        assert_eq!(name.len(), "app_".len() + 15 + ".log".len());
    }

    #[test]
    fn test_invalid_level_fails_before_install() {
        let config = LoggingConfig::new("chatty", "test");
        assert!(matches!(setup_logging(&config), Err(Error::Config(_))));
    }
}
