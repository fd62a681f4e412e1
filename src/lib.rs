//! Ampoule - presses a Ruby application into a single self-contained executable
//!
//! This crate provides the core library functionality for Ampoule,
//! including runtime version validation, build layout resolution, and
//! setup/press pipeline orchestration.

pub mod configure;
pub mod error;
pub mod layout;
pub mod options;
pub mod packager;
pub mod pipeline;
pub mod platform;
pub mod runtime;
pub mod util;

/// Test doubles for ampoule unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides scripted implementations of the subprocess
/// runner and the packaging collaborators.
#[cfg(test)]
pub mod test_support;

pub use error::Error;
pub use layout::BuildLayout;
pub use options::{LogLevel, Options};
pub use packager::{Packager, SystemPackager};
pub use pipeline::{Pipeline, Stage};
pub use platform::Platform;
pub use runtime::RuntimeSpec;
pub use util::process::{CommandRunner, SystemRunner};
