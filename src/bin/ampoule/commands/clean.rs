//! `ampoule clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use ampoule::layout::BuildLayout;
use ampoule::util::fs::remove_dir_all_if_exists;
use ampoule::util::process::SystemRunner;
use ampoule::{Options, Platform};

pub fn execute(args: CleanArgs) -> Result<()> {
    let platform = Platform::host();
    let runner = SystemRunner::new(platform);

    let options = Options::for_setup(args.prefix, None);
    let layout = BuildLayout::resolve(&options, platform, &runner)?;

    for dir in [&layout.deps, &layout.output] {
        remove_dir_all_if_exists(dir)?;
        eprintln!("     Removed {}", dir.display());
    }

    Ok(())
}
