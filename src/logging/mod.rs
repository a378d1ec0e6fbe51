//! Logging subsystem
//!
//! Structured logging via tracing with JSON (production) and plaintext
//! (development) output formats.
//!
//! # Environment Variables
//!
//! - `COMMONS_RELAY_LOG` - Primary log level/filter (takes precedence)
//! - `RUST_LOG` - Fallback log level/filter

use std::io;
use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Guard to track if logging has been initialized
static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON format for production (structured logs)
    Json,
    /// Human-readable plaintext for development
    #[default]
    Plaintext,
}

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// Write to stdout
    #[default]
    Stdout,
    /// Write to stderr
    Stderr,
}

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (JSON or plaintext)
    pub format: LogFormat,
    /// Output destination
    pub output: LogOutput,
    /// Default log level when no env filter is set
    pub default_level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Plaintext,
            output: LogOutput::Stdout,
            default_level: Level::INFO,
        }
    }
}

impl LogConfig {
    /// Create a development configuration (plaintext to stdout, debug level)
    pub fn development() -> Self {
        Self {
            format: LogFormat::Plaintext,
            output: LogOutput::Stdout,
            default_level: Level::DEBUG,
        }
    }

    /// Create a production configuration (JSON to stdout, info level)
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            default_level: Level::INFO,
        }
    }
}

/// Error type for logging initialization
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to parse log filter: {0}")]
    FilterParse(#[from] tracing_subscriber::filter::ParseError),
    #[error("logging already initialized")]
    AlreadyInitialized,
    #[error("failed to initialize subscriber: {0}")]
    Init(String),
}

/// Build an EnvFilter from environment variables or the default level.
///
/// Checks COMMONS_RELAY_LOG first, then RUST_LOG, falling back to the
/// default level.
fn build_env_filter(default_level: Level) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = std::env::var("COMMONS_RELAY_LOG") {
        return Ok(EnvFilter::try_new(filter)?);
    }
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return Ok(EnvFilter::try_new(filter)?);
    }

    let level = default_level.as_str().to_lowercase();
    Ok(EnvFilter::try_new(format!(
        "{level},commons_relay={level}"
    ))?)
}

/// Initialize the logging subsystem with the given configuration.
///
/// Call once at application startup; subsequent calls return an error.
pub fn init_logging(config: LogConfig) -> Result<(), LoggingError> {
    if INIT_GUARD.set(()).is_err() {
        return Err(LoggingError::AlreadyInitialized);
    }
    try_init_with(config)
}

/// Initialize logging for tests.
///
/// Uses test-friendly defaults (plaintext, debug level) and silently ignores
/// errors if logging is already initialized, making it safe to call from
/// multiple tests.
pub fn init_test_logging() {
    let _ = try_init_with(LogConfig::development());
}

fn try_init_with(config: LogConfig) -> Result<(), LoggingError> {
    let filter = build_env_filter(config.default_level)?;
    let timer = UtcTime::rfc_3339();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_target(true);

    let result = match (config.format, config.output) {
        (LogFormat::Json, LogOutput::Stdout) => builder.json().with_writer(io::stdout).try_init(),
        (LogFormat::Json, LogOutput::Stderr) => builder.json().with_writer(io::stderr).try_init(),
        (LogFormat::Plaintext, LogOutput::Stdout) => builder.with_writer(io::stdout).try_init(),
        (LogFormat::Plaintext, LogOutput::Stderr) => builder.with_writer(io::stderr).try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
