//! Resolved invocation options.
//!
//! The CLI (and the config layer underneath it) produce one `Options`
//! value per invocation; every downstream component consumes the struct,
//! never a loose key/value mapping.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix value selecting the current working directory.
pub const PREFIX_PWD: &str = "PWD";

/// Log verbosity forwarded to the packed-filesystem tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "invalid log level '{}'; expected error, warn, info, debug or trace",
                s
            )),
        }
    }
}

/// One pipeline invocation's worth of resolved options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Packaging prefix. `None` selects the per-user default,
    /// [`PREFIX_PWD`] selects the current working directory.
    pub prefix: Option<String>,

    /// Final package path. `None` derives it from the entry point.
    pub output: Option<PathBuf>,

    /// Application entry point, resolved against the project root.
    /// Required for press, absent for setup-only invocations.
    pub entry_point: Option<PathBuf>,

    /// Project root containing the application to pack.
    pub root: PathBuf,

    /// Requested Ruby version. `None` selects the catalog default.
    pub ruby: Option<String>,

    /// Log verbosity for the image tooling.
    pub log_level: LogLevel,
}

impl Options {
    /// Options for a setup-only invocation.
    pub fn for_setup(prefix: Option<String>, ruby: Option<String>) -> Options {
        Options {
            prefix,
            ruby,
            root: PathBuf::from("."),
            ..Options::default()
        }
    }

    /// The entry point, which press invocations must supply.
    pub fn entry_point(&self) -> anyhow::Result<&PathBuf> {
        self.entry_point
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no application entry point specified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Error);
        assert_eq!(LogLevel::default().as_str(), "error");
    }

    #[test]
    fn test_setup_options() {
        let opts = Options::for_setup(Some("PWD".into()), Some("3.2.5".into()));
        assert_eq!(opts.prefix.as_deref(), Some(PREFIX_PWD));
        assert!(opts.entry_point().is_err());
    }
}
