//! Resolved runtime version.

use std::fmt;

use crate::error::{Error, Result};

/// SHA-256 content digest, held as raw bytes and rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Digest> {
        let bytes = hex::decode(s).ok()?;
        bytes.try_into().ok().map(Digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Digest {
        Digest(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A validated runtime version paired with its source-tarball digest.
///
/// Immutable once resolved; identity is the version string. Derived tags
/// and feature predicates are pure functions of the version so callers
/// branch on the spec instead of re-parsing the string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSpec {
    version: String,
    major: u64,
    minor: u64,
    patch: u64,
    digest: Digest,
}

impl RuntimeSpec {
    /// Build a spec from a format-checked version string and its catalog
    /// digest.
    pub(crate) fn new(version: &str, digest_hex: &str) -> Result<RuntimeSpec> {
        let mut parts = version.split('.').map(|p| p.parse::<u64>());
        let (major, minor, patch) = match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch))) => (major, minor, patch),
            _ => return Err(Error::InvalidVersionFormat(version.to_string())),
        };

        // Digests come from the static catalog table.
        let digest = Digest::from_hex(digest_hex).expect("catalog digest is 64-char hex");

        Ok(RuntimeSpec {
            version: version.to_string(),
            major,
            minor,
            patch,
            digest,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// API version tag: `{major}.{minor}.0`.
    pub fn api_version(&self) -> String {
        format!("{}.{}.0", self.major, self.minor)
    }

    /// Library version tag: `{major}{minor}0`, concatenated.
    pub fn lib_version(&self) -> String {
        format!("{}{}0", self.major, self.minor)
    }

    /// Ruby 3.x?
    pub fn ruby3x(&self) -> bool {
        self.major == 3
    }

    /// Ruby 3.1 or later?
    pub fn ruby31(&self) -> bool {
        self.ruby3x() && self.minor >= 1
    }

    /// Ruby 3.2 or later?
    pub fn ruby32(&self) -> bool {
        self.ruby3x() && self.minor >= 2
    }

    /// Exactly the Ruby 3.2 series?
    pub fn ruby32_only(&self) -> bool {
        self.ruby3x() && self.minor == 2
    }

    /// Ruby 3.3 or later?
    pub fn ruby33(&self) -> bool {
        self.ruby3x() && self.minor >= 3
    }
}

impl fmt::Display for RuntimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}
