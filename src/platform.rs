//! Host platform identification and generator selection.
//!
//! The platform family is resolved once at startup and passed down
//! explicitly; nothing else in the crate inspects platform strings.

use std::fmt;

use crate::error::{Error, Result};

/// Host platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Macos,
    /// Windows family: native, MSYS2/MinGW, Cygwin.
    Windows,
    /// Anything else; packaging is refused for these hosts.
    Unknown,
}

impl Platform {
    /// Resolve the platform family for the running host.
    pub fn host() -> Platform {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unknown
        }
    }

    /// The CMake generator used on this platform.
    ///
    /// Total over the supported domain; any other host is a fatal,
    /// non-retryable error.
    pub fn generator(&self) -> Result<&'static str> {
        match self {
            Platform::Linux | Platform::Macos => Ok("Unix Makefiles"),
            Platform::Windows => Ok("MinGW Makefiles"),
            Platform::Unknown => Err(Error::UnsupportedPlatform(self.to_string())),
        }
    }

    /// Whether this is the Windows family (MSYS2/MinGW/Cygwin included).
    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Macos => "darwin",
            Platform::Windows => "windows",
            Platform::Unknown => std::env::consts::OS,
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_selection() {
        assert_eq!(Platform::Linux.generator().unwrap(), "Unix Makefiles");
        assert_eq!(Platform::Macos.generator().unwrap(), "Unix Makefiles");
        assert_eq!(Platform::Windows.generator().unwrap(), "MinGW Makefiles");
    }

    #[test]
    fn test_unknown_platform_is_fatal() {
        let err = Platform::Unknown.generator().unwrap_err();
        assert_eq!(err.code(), 254);
    }

    #[test]
    fn test_host_is_supported_in_ci() {
        // The test matrix only covers the three supported families.
        assert_ne!(Platform::host(), Platform::Unknown);
    }
}
