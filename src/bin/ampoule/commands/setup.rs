//! `ampoule setup` command

use anyhow::Result;

use crate::cli::SetupArgs;
use ampoule::packager::SystemPackager;
use ampoule::pipeline::{ensure_cmake, Pipeline};
use ampoule::util::config;
use ampoule::util::process::SystemRunner;
use ampoule::{Options, Platform};

pub fn execute(args: SetupArgs) -> Result<()> {
    let config = load_merged_config();

    let options = Options::for_setup(
        args.prefix.or(config.build.prefix.clone()),
        args.ruby.or(config.build.ruby.clone()),
    );

    let platform = Platform::host();
    let runner = SystemRunner::new(platform);
    let packager = SystemPackager::new(&runner);

    // Version and layout validation come first; their errors carry fixed
    // codes and must not depend on the toolchain being installed.
    let mut pipeline = Pipeline::new(&options, platform, config.toolchain, &runner, &packager)?;
    ensure_cmake()?;
    pipeline.setup()?;

    eprintln!(
        "    Finished setup for Ruby {} at {}",
        pipeline.spec().version(),
        pipeline.layout().prefix.display()
    );
    Ok(())
}

/// Global config overlaid with the project config in the working directory.
pub fn load_merged_config() -> config::Config {
    let cwd = std::env::current_dir().unwrap_or_default();
    let project = config::project_config_path(&cwd);

    match config::global_config_path() {
        Some(global) => config::load_config(&global, &project),
        None => config::load_config(std::path::Path::new(""), &project),
    }
}
