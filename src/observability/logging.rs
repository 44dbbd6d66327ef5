//! Structured logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when neither `SQLKV_LOG` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "warn,sqlkv=info";

/// Filter used with `--verbose`.
const VERBOSE_FILTER: &str = "info,sqlkv=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, defaulting to pretty output.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from the environment.
    ///
    /// Reads `SQLKV_LOG` (falling back to `RUST_LOG`), `SQLKV_LOG_FORMAT` and
    /// `SQLKV_LOG_FILE`. `verbose` raises the default filter.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        let directives = std::env::var("SQLKV_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .filter(|v| !v.is_empty());

        let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
        let filter = directives
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| EnvFilter::new(fallback));

        Self {
            format: std::env::var("SQLKV_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            filter,
            file: std::env::var_os("SQLKV_LOG_FILE").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }
}
