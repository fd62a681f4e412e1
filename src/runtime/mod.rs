//! Ruby runtime version handling.
//!
//! This module owns the supported-version catalog and the resolved
//! [`RuntimeSpec`] the rest of the pipeline consumes.

pub mod catalog;
pub mod spec;

pub use catalog::{resolve, DEFAULT_VERSION, MIN_VERSION_WINDOWS, SUPPORTED_VERSIONS};
pub use spec::{Digest, RuntimeSpec};
