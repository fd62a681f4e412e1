//! `ampoule press` command

use anyhow::Result;

use crate::cli::PressArgs;
use crate::commands::setup::load_merged_config;
use ampoule::packager::SystemPackager;
use ampoule::pipeline::{ensure_cmake, Pipeline};
use ampoule::util::process::SystemRunner;
use ampoule::{Options, Platform};

pub fn execute(args: PressArgs) -> Result<()> {
    let config = load_merged_config();

    let options = Options {
        prefix: args.prefix.or(config.build.prefix.clone()),
        output: args.output,
        entry_point: Some(args.entry_point),
        root: args.root,
        ruby: args.ruby.or(config.build.ruby.clone()),
        log_level: args
            .log_level
            .or(config.build.log_level)
            .unwrap_or_default(),
    };

    let platform = Platform::host();
    let runner = SystemRunner::new(platform);
    let packager = SystemPackager::new(&runner);

    let mut pipeline = Pipeline::new(&options, platform, config.toolchain, &runner, &packager)?;
    ensure_cmake()?;
    pipeline.run()?;

    if let Some(package) = &pipeline.layout().package {
        eprintln!("    Finished packaging {}", package.display());
    }
    Ok(())
}
