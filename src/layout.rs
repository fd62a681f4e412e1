//! Build layout resolution.
//!
//! Everything path-shaped the pipeline touches is derived here, once, from
//! the invocation options and the host platform. The resulting
//! [`BuildLayout`] is immutable; downstream components never re-derive a
//! path or consult the options mapping again.

use std::env;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use anyhow::{Context, Result};

use crate::options::{Options, PREFIX_PWD};
use crate::platform::Platform;
use crate::util::process::CommandRunner;

/// Environment variable overriding the dependency directory. Intended for
/// CI setups that share a prebuilt dependency tree between jobs.
pub const DEPS_ENV: &str = "AMPOULE_DEPS";

/// Environment variable overriding the bundled CMake recipe tree.
pub const SOURCE_ENV: &str = "AMPOULE_SOURCE";

/// All filesystem locations and the generator for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Packaging prefix everything else nests under.
    pub prefix: PathBuf,

    /// Dependency tree (Ruby sources, built gems, packaging tools).
    pub deps: PathBuf,

    /// CMake binary directory for the setup/press builds.
    pub output: PathBuf,

    /// Staging tree the deploy step populates: application source.
    pub src_dir: PathBuf,

    /// Staging tree: pre-image files (descriptors, patched loaders).
    pub pre_dir: PathBuf,

    /// Staging tree: binaries destined for the image.
    pub bin_dir: PathBuf,

    /// Packaging tool binaries built during setup.
    pub deps_bin_dir: PathBuf,

    /// Stash of the pristine runtime tree produced by setup.
    pub stash_dir: PathBuf,

    /// Final package path; absent for setup-only invocations, absolute
    /// otherwise.
    pub package: Option<PathBuf>,

    /// Project root, absolute with exactly one trailing separator.
    pub root: PathBuf,

    /// The CMake recipe tree driving setup and press.
    pub source: PathBuf,

    /// Platform-normalized working directory of the invocation.
    pub cwd: PathBuf,

    /// CMake generator for the host.
    pub generator: &'static str,
}

impl BuildLayout {
    /// Derive the layout from options and host platform.
    ///
    /// Idempotent for identical inputs. The runner is used only on the
    /// Windows family, where the working directory must be translated to
    /// the native path syntax the generator expects; a failed translation
    /// is fatal, never ignored.
    pub fn resolve(
        options: &Options,
        platform: Platform,
        runner: &dyn CommandRunner,
    ) -> Result<BuildLayout> {
        let generator = platform.generator()?;

        let cwd = env::current_dir().context("failed to get current directory")?;
        let cwd = native_cwd(&cwd, platform, runner)?;

        let prefix = resolve_prefix(options.prefix.as_deref(), &cwd);
        let deps = resolve_deps(&prefix);
        let output = prefix.join("output");

        let package = options
            .entry_point
            .as_ref()
            .map(|entry| resolve_package(options.output.as_deref(), entry, &cwd));

        let root = normalize_dir(&absolutize(&options.root, &cwd));

        Ok(BuildLayout {
            src_dir: output.join("s"),
            pre_dir: output.join("p"),
            bin_dir: output.join("b"),
            deps_bin_dir: deps.join("bin"),
            stash_dir: deps.join("stash"),
            prefix,
            deps,
            output,
            package,
            root,
            source: source_root(),
            cwd,
            generator,
        })
    }
}

/// Translate the working directory into the form the generator expects.
/// Unix hosts use it as-is; the Windows family goes through `cygpath -w`.
fn native_cwd(cwd: &Path, platform: Platform, runner: &dyn CommandRunner) -> Result<PathBuf> {
    if !platform.is_windows() {
        return Ok(cwd.to_path_buf());
    }

    let argv = vec![
        "cygpath".to_string(),
        "-w".to_string(),
        cwd.display().to_string(),
    ];
    let translated = runner.run_captured(&argv)?;
    Ok(PathBuf::from(translated.trim()))
}

fn resolve_prefix(prefix: Option<&str>, cwd: &Path) -> PathBuf {
    match prefix {
        None => {
            let default = default_prefix(cwd);
            println!("No prefix specified, using {}", default.display());
            default
        }
        Some(PREFIX_PWD) => cwd.to_path_buf(),
        Some(p) => absolutize(&expand_home(p), cwd),
    }
}

/// Per-user default packaging prefix.
fn default_prefix(cwd: &Path) -> PathBuf {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".ampoule"))
        .unwrap_or_else(|| cwd.join(".ampoule"))
}

/// Dependency directory: override variable wins; a relative override is
/// resolved against the prefix.
fn resolve_deps(prefix: &Path) -> PathBuf {
    match env::var_os(DEPS_ENV) {
        Some(deps) => {
            let deps = PathBuf::from(deps);
            if deps.is_absolute() {
                deps
            } else {
                prefix.join(deps)
            }
        }
        None => prefix.join("deps"),
    }
}

/// Final package path: explicit output, or the entry point's base name
/// (extension stripped) in the working directory.
fn resolve_package(output: Option<&Path>, entry_point: &Path, cwd: &Path) -> PathBuf {
    let package = match output {
        Some(out) => out.to_path_buf(),
        None => {
            let stem = entry_point
                .file_stem()
                .unwrap_or_else(|| entry_point.as_os_str());
            cwd.join(stem)
        }
    };

    absolutize(&package, cwd)
}

/// The CMake recipe tree bundled with the tool: override variable, then
/// the conventional install location next to the executable, then the
/// development checkout.
fn source_root() -> PathBuf {
    if let Some(source) = env::var_os(SOURCE_ENV) {
        return PathBuf::from(source);
    }

    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            let share = dir.join("..").join("share").join("ampoule");
            if share.join("CMakeLists.txt").exists() {
                return share;
            }
        }
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

/// Exactly one representation for a directory: absolute, single trailing
/// separator.
fn normalize_dir(path: &Path) -> PathBuf {
    let mut s = path.to_string_lossy().into_owned();
    while s.len() > 1 && (s.ends_with(MAIN_SEPARATOR) || s.ends_with('/')) {
        s.pop();
    }
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    PathBuf::from(s)
}
