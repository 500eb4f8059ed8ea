use std::env;
use std::io;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::Level;

/// Crates of this workspace that log at the configured level.
///
/// Third-party crates are capped at `INFO` unless `RUST_LOG` says otherwise.
const CRATE_NAMES: &[&str] = &[
    "sieve",
    "sieve_common",
    "sieve_config",
    "sieve_event",
    "sieve_filter",
    "sieve_log",
    "sieve_sampling",
];

/// Controls the log format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    #[default]
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO sieve::cli: rule 3 added to project 42
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2024-12-04T12:10:32.123Z  INFO sieve::cli: rule 3 added to project 42
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2024-12-04T12:11:08.729716Z","level":"INFO","message":"rule 3 added to project 42","target":"sieve::cli"}
    /// ```
    Json,
}

/// Controls the logging system.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the workspace crates.
    pub level: Level,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based on the TTY.
    pub format: LogFormat,
}

fn default_filter(level: Level) -> EnvFilter {
    let mut directives = vec![Level::Info.min(level).as_str().to_owned()];
    for name in CRATE_NAMES {
        directives.push(format!("{name}={level}"));
    }
    EnvFilter::new(directives.join(","))
}

/// Initialize the logging system.
///
/// Logs are written to `stderr`, so that command output on `stdout` stays machine readable. If
/// the `RUST_LOG` environment variable is set, it takes precedence over the configured level.
///
/// Calling this more than once has no effect.
pub fn init(config: &LogConfig) {
    let filter = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => default_filter(config.level),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let result = match (config.format, console::user_attended_stderr()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => builder.with_ansi(true).try_init(),
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            builder.with_ansi(false).compact().try_init()
        }
        (LogFormat::Json, _) => builder
            .with_ansi(false)
            .json()
            .flatten_event(true)
            .try_init(),
    };

    if result.is_err() {
        crate::debug!("logging was already initialized");
    }
}
