//! Packaging error taxonomy with stable numeric codes.
//!
//! The numeric codes are a wire contract: operator tooling maps them to
//! remediations, and the CLI process exits with the code of the error that
//! unwound the pipeline. Codes are never renumbered.

use thiserror::Error;

/// Exit code for errors outside the fixed packaging table.
pub const GENERIC_ERROR_CODE: i32 = 255;

/// Errors raised by the packaging pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("'ampoule setup' configure step failed")]
    SetupConfigure,

    #[error("'ampoule setup' build step failed")]
    SetupBuild,

    #[error("'ampoule press' configure step failed")]
    PressConfigure,

    #[error("'ampoule press' build step failed")]
    PressBuild,

    #[error("invalid Ruby version format '{0}', expected x.y.z")]
    InvalidVersionFormat(String),

    #[error("Ruby version {0} is not supported")]
    UnsupportedVersion(String),

    #[error("Ruby version {0} is not supported on Windows")]
    UnsupportedVersionOnWindows(String),

    #[error("{0} is not supported yet, exiting")]
    UnsupportedPlatform(String),

    /// Non-zero exit (or spawn failure) from an external command. Carries
    /// the combined output so the caller can surface it before propagating.
    #[error("failed to run {command}")]
    SubprocessFailed { command: String, output: String },
}

impl Error {
    /// The stable numeric code surfaced as the process exit status.
    pub fn code(&self) -> i32 {
        match self {
            Error::SetupConfigure => 101,
            Error::SetupBuild => 102,
            Error::PressConfigure => 103,
            Error::PressBuild => 104,
            Error::InvalidVersionFormat(_) => 109,
            Error::UnsupportedVersion(_) => 110,
            Error::UnsupportedVersionOnWindows(_) => 111,
            // The canonical 101-111 table has no host-platform entry; the
            // legacy code is retained for it.
            Error::UnsupportedPlatform(_) => 254,
            Error::SubprocessFailed { .. } => GENERIC_ERROR_CODE,
        }
    }

    /// Map a stage-failure code back to its error, for the orchestrator's
    /// positional configure/build mapping.
    pub fn stage_failure(code: i32) -> Error {
        match code {
            101 => Error::SetupConfigure,
            102 => Error::SetupBuild,
            103 => Error::PressConfigure,
            104 => Error::PressBuild,
            _ => unreachable!("not a stage failure code: {code}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
