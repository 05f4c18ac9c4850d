//! # Logger
//!
//! Process-wide logging for the negotiation host: a compact console layer, an optional
//! non-blocking rolling file, and `EnvFilter` directives on top of a base level.
//!
//! The builder is usually seeded from the host's [`LogConfig`] via
//! [`LoggerBuilder::from_config`]. `RUST_LOG`, when set, takes precedence over the configured
//! directives.
//!
//! ## Example
//!
//! ```rust
//! # use mora_logger::{LevelFilter, Logger};
//! let _logger = Logger::builder("mora-host")
//!     .level(LevelFilter::DEBUG)
//!     .directives("mora_state=warn")
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use mora_domain::config::LogConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
struct Settings {
    level: LevelFilter,
    directives: Option<String>,
    console: bool,
    directory: Option<PathBuf>,
    json: bool,
    max_files: usize,
    rotation: Rotation,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            directives: None,
            console: true,
            directory: None,
            json: false,
            max_files: DEFAULT_MAX_FILES,
            rotation: Rotation::DAILY,
        }
    }
}

/// Configures and installs the global tracing subscriber.
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    settings: Settings,
}

impl LoggerBuilder {
    /// Seeds a builder from the `[log]` section of the host configuration.
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] if `level` is not a known level name.
    pub fn from_config(name: impl Into<String>, config: &LogConfig) -> Result<Self, LoggerError> {
        let level = config.level.parse::<LevelFilter>().map_err(|e| {
            LoggerError::InvalidConfiguration {
                message: format!("Unknown log level '{}': {e}", config.level).into(),
                context: None,
            }
        })?;

        Ok(Self {
            name: name.into(),
            settings: Settings {
                level,
                directives: config.filter.clone(),
                console: config.console,
                directory: config.directory.clone(),
                json: config.json,
                max_files: config.max_files,
                rotation: Rotation::DAILY,
            },
        })
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    /// Extra `EnvFilter` directives such as `mora_wingman=debug,mora_state=warn`.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.settings.directives = Some(directives.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = enabled;
        self
    }

    /// Enables rolling file output in `directory`.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.settings.directory = Some(directory.into());
        self
    }

    /// Writes JSON lines to the log file instead of plain text.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.settings.json = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.settings.max_files = max;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.settings.rotation = rotation;
        self
    }

    /// Installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive until shutdown; dropping it stops the file writer.
    ///
    /// # Errors
    /// - [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`, bad
    ///   directives, or when neither console nor file output is enabled.
    /// - [`LoggerError::Appender`] if the rolling file cannot be opened.
    /// - [`LoggerError::Subscriber`] if a global subscriber is already installed.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let Self { name, settings } = self;
        validate(&name, &settings)?;

        let env_filter = build_env_filter(&settings)?;
        let mut layers = Vec::new();

        if settings.console {
            layers.push(layer().compact().with_target(true).with_ansi(true).boxed());
        }

        let guard = match &settings.directory {
            Some(directory) => {
                fs::create_dir_all(directory).map_err(|e| LoggerError::Internal {
                    message: e.to_string().into(),
                    context: Some(
                        format!("Failed to create log directory: {}", directory.display()).into(),
                    ),
                })?;

                let appender = RollingFileAppender::builder()
                    .rotation(settings.rotation.clone())
                    .filename_prefix(&name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(settings.max_files)
                    .build(directory)
                    .context(format!("Log directory: {}", directory.display()))?;

                let (writer, guard) = tracing_appender::non_blocking(appender);
                let file_layer = layer().with_writer(writer).with_ansi(false);
                layers.push(if settings.json {
                    file_layer.json().boxed()
                } else {
                    file_layer.boxed()
                });
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging output enabled. Enable the console or set a log directory."
                    .into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;
        tracing::debug!(logger = %name, level = %settings.level, "Logger initialized");

        Ok(Logger { guard, directory: settings.directory })
    }
}

/// Handle to the installed logging system.
///
/// Owns the non-blocking writer's guard; pending file lines are flushed when it drops.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
    directory: Option<PathBuf>,
}

impl Logger {
    /// Starts a builder. `name` prefixes rolling log files (`mora-host.2026-10-16.log`).
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder { name: name.into(), settings: Settings::default() }
    }

    /// Shorthand for [`LoggerBuilder::from_config`] followed by [`LoggerBuilder::init`].
    ///
    /// # Errors
    /// See [`LoggerBuilder::init`].
    pub fn from_config(name: impl Into<String>, config: &LogConfig) -> Result<Self, LoggerError> {
        LoggerBuilder::from_config(name, config)?.init()
    }

    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn validate(name: &str, settings: &Settings) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }
    if settings.directory.is_some() && settings.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }
    Ok(())
}

fn build_env_filter(settings: &Settings) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(settings.level.into());
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(builder.from_env_lossy());
    }
    match &settings.directives {
        Some(directives) => {
            builder.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid filter directives '{directives}': {e}").into(),
                context: None,
            })
        },
        None => Ok(builder.parse_lossy("")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn from_config_maps_every_field() {
        let config = LogConfig {
            level: "debug".into(),
            filter: Some("mora_state=warn".into()),
            console: false,
            directory: Some(PathBuf::from("/var/log/mora")),
            json: true,
            max_files: 3,
        };

        let builder = LoggerBuilder::from_config("mora-host", &config).unwrap();
        assert_eq!(builder.settings.level, LevelFilter::DEBUG);
        assert_eq!(builder.settings.directives.as_deref(), Some("mora_state=warn"));
        assert!(!builder.settings.console);
        assert!(builder.settings.json);
        assert_eq!(builder.settings.max_files, 3);
    }

    #[test]
    fn from_config_rejects_unknown_level() {
        let config = LogConfig { level: "chatty".into(), ..LogConfig::default() };
        let err = LoggerBuilder::from_config("mora-host", &config).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    #[serial]
    fn no_output_is_rejected_before_install() {
        let err = Logger::builder("silent").console(false).init().unwrap_err();
        assert!(err.to_string().contains("No logging output enabled"), "got: {err}");
    }

    #[test]
    #[serial]
    fn bad_directives_are_rejected() {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return;
        }
        let err = Logger::builder("filters").directives("mora=[").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }), "got: {err:?}");
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = validate("  ", &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("name cannot be empty"));
    }
}
