//! Supported Ruby version catalog.

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::runtime::spec::RuntimeSpec;

/// Supported Ruby versions and the SHA-256 digests of their source
/// tarballs. The digest travels into the setup configure arguments so the
/// dependency build can verify what it fetches.
pub const SUPPORTED_VERSIONS: &[(&str, &str)] = &[
    ("2.7.8", "c2dab63cbc8f2a05526108ad419efa63a67ed4074dbbcf9fc2b1ca664cb45ba0"),
    ("3.0.7", "2a3411977f2850431136b0fab8ad53af09fb74df2ee2f4fb7f11b378fe034388"),
    ("3.1.6", "0d0dafb859e76763432571a3109d1537d976266be3083445651dc68deed25c22"),
    ("3.2.4", "c72b3c5c30482dca18b0f868c9075f3f47d8168eaf626d4e682ce5b59c858692"),
    ("3.2.5", "ef0610b498f60fb5cfd77b51adb3c10f4ca8ed9a17cb87c61e5bea314ac34a16"),
    ("3.3.3", "83c05b2177ee9c335b631b29b8c077b4770166d02fa527f3a9f6a40d13f3cce2"),
    ("3.3.4", "fe6a30f97d54e029768f2ddf4923699c416cdbc3a6e96db3e2d5716c7db96a34"),
    ("3.3.5", "3781a3504222c2f26cb4b9eb9c1a12dbf4944d366ce24a9ff8cf99ecbce75196"),
];

/// Version selected when the invocation does not request one.
pub const DEFAULT_VERSION: &str = "3.2.5";

/// Oldest version the Windows-family toolchain can build.
pub const MIN_VERSION_WINDOWS: &str = "3.1.6";

/// Exactly three dot-separated non-negative integers.
static VERSION_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version format regex"));

/// Validate a requested version against the catalog and the host platform,
/// returning the resolved spec.
///
/// Checks run in a fixed order: format (109), catalog membership (110),
/// Windows minimum (111). The format gate runs before any table lookup.
pub fn resolve(requested: Option<&str>, platform: Platform) -> Result<RuntimeSpec> {
    let version = requested.unwrap_or(DEFAULT_VERSION);

    if !VERSION_FORMAT.is_match(version) {
        return Err(Error::InvalidVersionFormat(version.to_string()));
    }

    let digest = SUPPORTED_VERSIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, d)| *d)
        .ok_or_else(|| Error::UnsupportedVersion(version.to_string()))?;

    if platform.is_windows() && semver_of(version) < semver_of(MIN_VERSION_WINDOWS) {
        return Err(Error::UnsupportedVersionOnWindows(version.to_string()));
    }

    RuntimeSpec::new(version, digest)
}

fn semver_of(version: &str) -> Version {
    // Callers have already passed the three-integer format gate.
    Version::parse(version).expect("catalog version parses as semver")
}
