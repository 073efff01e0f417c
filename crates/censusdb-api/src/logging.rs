//! Logging configuration for CensusDB
//!
//! Thin wrapper over the `tracing` stack: an env-filterable subscriber
//! with optional rolling file output. Initialize once, early, and keep
//! the returned guard alive for the life of the process.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log events are written
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Stdout only
    Stdout,
    /// A daily-rolled file only
    File(PathBuf),
    /// Stdout and a daily-rolled file
    Both(PathBuf),
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set
    pub filter: String,
    /// Output destination
    pub output: LogOutput,
    /// Single-line compact format instead of the default pretty format
    pub compact: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            output: LogOutput::Stdout,
            compact: false,
        }
    }
}

impl LogConfig {
    /// Config at info level, stdout output.
    pub fn info() -> Self {
        Self::default()
    }

    /// Config at debug level, stdout output.
    pub fn debug() -> Self {
        Self {
            filter: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Route output to a daily-rolled file.
    pub fn to_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Route output to both stdout and a daily-rolled file.
    pub fn to_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Use the compact single-line format.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    /// Override the default filter directive.
    pub fn with_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filter = filter.into();
        self
    }

    /// Install the global subscriber.
    ///
    /// Returns a guard when file output is configured; dropping it stops
    /// the background log writer, so hold it until exit.
    pub fn init(self) -> Option<WorkerGuard> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .expect("Invalid log filter");

        let file_writer = |path: PathBuf| {
            let dir = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("censusdb.log")
                .to_string();
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name))
        };

        match self.output {
            LogOutput::Stdout => {
                let registry = tracing_subscriber::registry().with(env_filter);
                if self.compact {
                    registry.with(fmt::layer().compact()).init();
                } else {
                    registry.with(fmt::layer().pretty()).init();
                }
                None
            }
            LogOutput::File(path) => {
                let (non_blocking, guard) = file_writer(path);
                let registry = tracing_subscriber::registry().with(env_filter);
                if self.compact {
                    registry
                        .with(fmt::layer().with_writer(non_blocking).compact())
                        .init();
                } else {
                    registry
                        .with(fmt::layer().with_writer(non_blocking).pretty())
                        .init();
                }
                Some(guard)
            }
            LogOutput::Both(path) => {
                let (non_blocking, guard) = file_writer(path);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer())
                    .with(fmt::layer().with_writer(non_blocking))
                    .init();
                Some(guard)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "info");
        assert!(!config.compact);
        assert!(matches!(config.output, LogOutput::Stdout));
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::debug().to_file("/tmp/census.log").compact();
        assert_eq!(config.filter, "debug");
        assert!(config.compact);
        assert!(matches!(config.output, LogOutput::File(_)));
    }
}
