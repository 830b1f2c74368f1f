//! Logging initialisation for the node binary
//!
//! Composes up to two sinks over the registry: a non-blocking rolling file
//! (JSON or compact text) and an optional compact console layer. The
//! default filter quiets dependencies and keeps this crate at the
//! configured level; `RUST_LOG` overrides everything.

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    fn appender(self, dir: &str, file: &str) -> RollingFileAppender {
        match self {
            Rotation::Hourly => rolling::hourly(dir, file),
            Rotation::Daily => rolling::daily(dir, file),
            Rotation::Never => rolling::never(dir, file),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub log_dir: String,
    pub log_file: String,
    pub rotation: Rotation,
    /// Level for this crate's own events; dependencies stay at `warn`.
    pub log_level: String,
    /// Structured JSON in the file sink instead of compact text.
    pub use_json: bool,
    /// Mirror events to stdout.
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_file: "civica.log".to_string(),
            rotation: Rotation::Daily,
            log_level: "info".to_string(),
            use_json: false,
            console: true,
        }
    }
}

impl LogConfig {
    /// Dependencies log at `warn`; this crate at the configured level.
    fn default_directives(&self) -> String {
        format!("warn,civica={}", self.log_level)
    }

    /// `RUST_LOG` wins; otherwise the default directives apply.
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

pub fn init_logging(config: &LogConfig) -> WorkerGuard {
    let appender = config
        .rotation
        .appender(&config.log_dir, &config.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    // the file sink never wants ANSI; its format is a config choice
    let file_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.use_json {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_writer(file_writer)
            .with_ansi(false)
            .boxed()
    };

    let console_layer = config.console.then(|| fmt::layer().compact());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(config.filter())
        .init();

    guard
}
