//! Command implementations

pub mod clean;
pub mod completions;
pub mod press;
pub mod setup;
pub mod versions;
