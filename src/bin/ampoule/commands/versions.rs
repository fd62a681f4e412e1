//! `ampoule versions` command

use anyhow::Result;

use ampoule::runtime::{DEFAULT_VERSION, MIN_VERSION_WINDOWS, SUPPORTED_VERSIONS};

pub fn execute() -> Result<()> {
    println!("Supported Ruby versions:");
    for (version, digest) in SUPPORTED_VERSIONS {
        let marker = if *version == DEFAULT_VERSION {
            " (default)"
        } else {
            ""
        };
        println!("  {:<8} {}{}", version, digest, marker);
    }
    println!("Minimum version on Windows: {}", MIN_VERSION_WINDOWS);

    Ok(())
}
