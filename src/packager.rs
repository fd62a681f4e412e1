//! Packaging collaborators: descriptor generation, staging, image build.
//!
//! The pipeline drives these through the [`Packager`] trait and never
//! looks inside them; a failure here propagates as-is. [`SystemPackager`]
//! is the production implementation backed by the staging tree on disk and
//! the `mkdwarfs` tool built during setup.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::layout::BuildLayout;
use crate::options::{LogLevel, Options};
use crate::runtime::RuntimeSpec;
use crate::util::fs::{copy_dir_all, dir_file_count, ensure_dir, remove_dir_all_if_exists};
use crate::util::process::{find_executable, CommandRunner};

/// In-image mount point the packed filesystem appears under at run time.
pub const MOUNT_POINT: &str = "/__ampoule_memfs__";

/// File name the package descriptor travels under inside the staging tree.
pub const DESCRIPTOR_FILE: &str = ".ampoule.json";

/// Packaging scenario derived from the options and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Entry point as the packed application will resolve it: absolute
    /// paths verbatim, everything else relative to the project root.
    pub fs_entrance: PathBuf,
}

impl Scenario {
    pub fn configure(options: &Options, layout: &BuildLayout) -> Result<Scenario> {
        let entry_point = options.entry_point()?;
        let fs_entrance = if entry_point.is_absolute() {
            entry_point.clone()
        } else {
            layout.root.join(entry_point)
        };

        Ok(Scenario { fs_entrance })
    }
}

/// Build metadata consumed by the image-build step and embedded in the
/// package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub ruby_version: String,
    pub ruby_api_version: String,
    pub mount_point: String,
    pub entry_point: PathBuf,
    pub root: PathBuf,
    pub package: PathBuf,
    pub log_level: LogLevel,
}

/// The staging/image collaborators the pipeline delegates to after the
/// press build succeeds.
pub trait Packager {
    /// Emit the package descriptor for this invocation.
    fn generate_descriptor(
        &self,
        options: &Options,
        spec: &RuntimeSpec,
        layout: &BuildLayout,
        scenario: &Scenario,
    ) -> Result<PackageDescriptor>;

    /// Prepare the staging tree, starting from the stash setup produced.
    fn init(&self, stash: &Path, src: &Path, pre: &Path, bin: &Path) -> Result<()>;

    /// Stage the application tree for the image.
    fn deploy(
        &self,
        src: &Path,
        pre: &Path,
        spec: &RuntimeSpec,
        root: &Path,
        entry_point: &Path,
        cwd: &Path,
    ) -> Result<()>;

    /// Compress the staging tree into the packed-filesystem image.
    fn mkdwarfs(
        &self,
        deps_bin: &Path,
        image: &Path,
        src: &Path,
        descriptor: &PackageDescriptor,
    ) -> Result<()>;
}

/// Image file the packed filesystem is written to, next to the package.
pub fn image_path(package: &Path) -> PathBuf {
    let mut name = package.as_os_str().to_os_string();
    name.push(".ampoule");
    PathBuf::from(name)
}

/// Production packager operating on the staging tree.
pub struct SystemPackager<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> SystemPackager<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> SystemPackager<'a> {
        SystemPackager { runner }
    }

    fn mkdwarfs_tool(&self, deps_bin: &Path) -> Result<PathBuf> {
        let built = deps_bin.join("mkdwarfs");
        if built.exists() {
            return Ok(built);
        }
        if let Some(found) = find_executable("mkdwarfs") {
            return Ok(found);
        }
        bail!(
            "mkdwarfs not found\n\
             \n\
             The image builder is produced by `ampoule setup` under {}.\n\
             Run setup first, or install dwarfs so mkdwarfs is in your PATH.",
            deps_bin.display()
        );
    }
}

impl Packager for SystemPackager<'_> {
    fn generate_descriptor(
        &self,
        options: &Options,
        spec: &RuntimeSpec,
        layout: &BuildLayout,
        scenario: &Scenario,
    ) -> Result<PackageDescriptor> {
        let package = layout
            .package
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no package path in layout"))?;

        let descriptor = PackageDescriptor {
            ruby_version: spec.version().to_string(),
            ruby_api_version: spec.api_version(),
            mount_point: MOUNT_POINT.to_string(),
            entry_point: scenario.fs_entrance.clone(),
            root: layout.root.clone(),
            package,
            log_level: options.log_level,
        };

        ensure_dir(&layout.pre_dir)?;
        let path = layout.pre_dir.join(DESCRIPTOR_FILE);
        let json = serde_json::to_string_pretty(&descriptor)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write descriptor: {}", path.display()))?;
        tracing::debug!("wrote package descriptor to {}", path.display());

        Ok(descriptor)
    }

    fn init(&self, stash: &Path, src: &Path, pre: &Path, bin: &Path) -> Result<()> {
        if !stash.exists() {
            bail!(
                "runtime stash not found: {}\n\
                 \n\
                 The stash is produced by `ampoule setup`; run setup first.",
                stash.display()
            );
        }

        for dir in [src, pre, bin] {
            remove_dir_all_if_exists(dir)?;
            ensure_dir(dir)?;
        }

        Ok(())
    }

    fn deploy(
        &self,
        src: &Path,
        pre: &Path,
        spec: &RuntimeSpec,
        root: &Path,
        entry_point: &Path,
        cwd: &Path,
    ) -> Result<()> {
        tracing::info!(
            "deploying {} (Ruby {}) from {}",
            entry_point.display(),
            spec.version(),
            cwd.display()
        );

        let app_dir = src.join("app");
        copy_dir_all(root, &app_dir)
            .with_context(|| format!("failed to stage project root {}", root.display()))?;

        let staged_entry = app_dir.join(entry_point);
        if !entry_point.is_absolute() && !staged_entry.exists() {
            bail!(
                "entry point {} not found under project root {}",
                entry_point.display(),
                root.display()
            );
        }

        ensure_dir(pre)?;
        tracing::info!("staged {} files", dir_file_count(&app_dir));

        Ok(())
    }

    fn mkdwarfs(
        &self,
        deps_bin: &Path,
        image: &Path,
        src: &Path,
        descriptor: &PackageDescriptor,
    ) -> Result<()> {
        // The descriptor travels inside the image.
        let descriptor_path = src.join(DESCRIPTOR_FILE);
        std::fs::write(&descriptor_path, serde_json::to_string_pretty(descriptor)?)
            .with_context(|| format!("failed to write {}", descriptor_path.display()))?;

        let tool = self.mkdwarfs_tool(deps_bin)?;
        let argv = vec![
            tool.display().to_string(),
            "-i".to_string(),
            src.display().to_string(),
            "-o".to_string(),
            image.display().to_string(),
            "--no-progress".to_string(),
            "--log-level".to_string(),
            descriptor.log_level.to_string(),
        ];
        self.runner.run_captured(&argv)?;

        let digest = sha256_file(image)?;
        tracing::info!("image {} sha256 {}", image.display(), digest);

        Ok(())
    }
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
