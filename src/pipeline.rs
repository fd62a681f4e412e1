//! Pipeline orchestration: setup and press stage sequencing.
//!
//! Stages run strictly in order; a failure is terminal for the invocation
//! and carries the fixed code for the stage that failed. Parallelism is
//! delegated into each generator invocation via `--parallel`; the
//! orchestrator itself never runs build steps concurrently.

use anyhow::{bail, Result};

use crate::configure;
use crate::error::Error;
use crate::layout::BuildLayout;
use crate::options::Options;
use crate::packager::{image_path, Packager, Scenario};
use crate::platform::Platform;
use crate::runtime::{self, RuntimeSpec};
use crate::util::config::ToolchainConfig;
use crate::util::env::EnvScope;
use crate::util::process::{find_cmake, CommandRunner};

/// CMake target built by the press stage.
const PRESS_TARGET: &str = "ampoule";

/// Orchestrator state. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ConfiguringSetup,
    BuildingSetup,
    ConfiguringPress,
    BuildingPress,
    Delegated,
    Done,
    Failed(i32),
}

/// One packaging pipeline invocation.
///
/// Version and layout are resolved once at construction, before any
/// subprocess runs; a validation failure leaves no partial state behind.
pub struct Pipeline<'a> {
    options: &'a Options,
    platform: Platform,
    toolchain: ToolchainConfig,
    spec: RuntimeSpec,
    layout: BuildLayout,
    runner: &'a dyn CommandRunner,
    packager: &'a dyn Packager,
    stage: Stage,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("platform", &self.platform)
            .field("toolchain", &self.toolchain)
            .field("spec", &self.spec)
            .field("layout", &self.layout)
            .field("runner", &"<dyn CommandRunner>")
            .field("packager", &"<dyn Packager>")
            .field("stage", &self.stage)
            .finish()
    }
}

impl<'a> Pipeline<'a> {
    pub fn new(
        options: &'a Options,
        platform: Platform,
        toolchain: ToolchainConfig,
        runner: &'a dyn CommandRunner,
        packager: &'a dyn Packager,
    ) -> Result<Pipeline<'a>> {
        let spec = runtime::resolve(options.ruby.as_deref(), platform)?;
        let layout = BuildLayout::resolve(options, platform, runner)?;

        Ok(Pipeline {
            options,
            platform,
            toolchain,
            spec,
            layout,
            runner,
            packager,
            stage: Stage::Idle,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn spec(&self) -> &RuntimeSpec {
        &self.spec
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Run the full sequence: setup stages, then press stages, then the
    /// image-build delegation.
    pub fn run(&mut self) -> Result<()> {
        self.setup()?;
        self.press()
    }

    /// Configure and build the runtime/dependency tree.
    pub fn setup(&mut self) -> Result<()> {
        let configure_args = configure::setup_args(&self.layout, &self.spec);
        self.run_stage(Stage::ConfiguringSetup, 101, configure_args)?;
        self.run_stage(Stage::BuildingSetup, 102, self.build_args(None))?;
        Ok(())
    }

    /// Configure and build the application package, then delegate the
    /// image build.
    pub fn press(&mut self) -> Result<()> {
        println!(
            "{}",
            configure::press_announce(&self.layout, &self.spec, self.options)
        );

        let mut configure_args = configure::setup_args(&self.layout, &self.spec);
        configure_args.extend(configure::press_args(&self.layout, self.options)?);
        self.run_stage(Stage::ConfiguringPress, 103, configure_args)?;
        self.run_stage(Stage::BuildingPress, 104, self.build_args(Some(PRESS_TARGET)))?;

        self.stage = Stage::Delegated;
        if let Err(e) = self.delegate_image_build() {
            self.stage = Stage::Failed(
                e.downcast_ref::<Error>()
                    .map(Error::code)
                    .unwrap_or(crate::error::GENERIC_ERROR_CODE),
            );
            return Err(e);
        }

        self.stage = Stage::Done;
        Ok(())
    }

    /// `cmake --build` arguments with the parallel fan-out flag.
    fn build_args(&self, target: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--build".to_string(),
            self.layout.output.display().to_string(),
        ];
        if let Some(target) = target {
            args.push("--target".to_string());
            args.push(target.to_string());
        }
        args.push("--parallel".to_string());
        args.push(self.runner.ncores().to_string());
        args
    }

    /// Run one generator invocation under the scoped build environment,
    /// mapping a failure to the stage's fixed code.
    fn run_stage(&mut self, stage: Stage, failure_code: i32, args: Vec<String>) -> Result<()> {
        self.stage = stage;
        tracing::debug!(
            "{:?}: {}",
            stage,
            configure::render_command_line("cmake", &args)
        );

        let mut argv = vec!["cmake".to_string()];
        argv.extend(args);

        let overrides = build_env(self.platform, &self.toolchain);
        let runner = self.runner;
        match EnvScope::with(overrides, || runner.run_captured(&argv)) {
            Ok(_) => Ok(()),
            Err(e) => {
                // The runner already surfaced the captured output.
                tracing::debug!("stage {:?} failed: {}", stage, e);
                self.stage = Stage::Failed(failure_code);
                Err(Error::stage_failure(failure_code).into())
            }
        }
    }

    /// Hand off to the packaging collaborators. Their failures propagate
    /// as-is; nothing here retries or inspects them.
    fn delegate_image_build(&self) -> Result<()> {
        let scenario = Scenario::configure(self.options, &self.layout)?;
        let descriptor =
            self.packager
                .generate_descriptor(self.options, &self.spec, &self.layout, &scenario)?;

        self.packager.init(
            &self.layout.stash_dir,
            &self.layout.src_dir,
            &self.layout.pre_dir,
            &self.layout.bin_dir,
        )?;

        let entry_point = self.options.entry_point()?;
        self.packager.deploy(
            &self.layout.src_dir,
            &self.layout.pre_dir,
            &self.spec,
            &self.layout.root,
            entry_point,
            &self.layout.cwd,
        )?;

        let package = self
            .layout
            .package
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no package path in layout"))?;
        self.packager.mkdwarfs(
            &self.layout.deps_bin_dir,
            &image_path(package),
            &self.layout.src_dir,
            &descriptor,
        )?;

        Ok(())
    }
}

/// Environment overrides for generator invocations: compiler paths and
/// C++ flags. Config-file values take precedence over the environment;
/// the compilers fall back to gcc/g++.
pub(crate) fn build_env(platform: Platform, toolchain: &ToolchainConfig) -> Vec<(String, String)> {
    let user_flags = if toolchain.cxxflags.is_empty() {
        std::env::var("CXXFLAGS").unwrap_or_default()
    } else {
        toolchain.cxxflags.join(" ")
    };

    let cxxflags = if platform == Platform::Macos {
        format!("-DTARGET_OS_SIMULATOR=0 -DTARGET_OS_IPHONE=0 {}", user_flags)
    } else {
        user_flags
    };

    let cc = toolchain
        .cc
        .as_ref()
        .map(|p| p.display().to_string())
        .or_else(|| std::env::var("CC").ok())
        .unwrap_or_else(|| "gcc".to_string());
    let cxx = toolchain
        .cxx
        .as_ref()
        .map(|p| p.display().to_string())
        .or_else(|| std::env::var("CXX").ok())
        .unwrap_or_else(|| "g++".to_string());

    vec![
        ("CXXFLAGS".to_string(), cxxflags),
        ("CC".to_string(), cc),
        ("CXX".to_string(), cxx),
    ]
}

/// Fail early with an actionable message when CMake is missing.
pub fn ensure_cmake() -> Result<()> {
    if find_cmake().is_none() {
        bail!(
            "CMake not found\n\
             \n\
             CMake drives the setup and press builds.\n\
             Install CMake and ensure it's in your PATH."
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PREFIX_PWD;
    use crate::test_support::{MockRunner, RecordingPackager};
    use serial_test::serial;
    use std::path::PathBuf;

    fn options() -> Options {
        Options {
            prefix: Some(PREFIX_PWD.into()),
            output: Some(PathBuf::from("/tmp/bundle")),
            entry_point: Some(PathBuf::from("app.rb")),
            root: PathBuf::from("."),
            ruby: Some("3.2.5".into()),
            log_level: Default::default(),
        }
    }

    fn toolchain() -> ToolchainConfig {
        ToolchainConfig::default()
    }

    #[test]
    #[serial]
    fn test_full_run_sequences_stages() {
        let opts = options();
        let runner = MockRunner::ok().with_ncores(8);
        let packager = RecordingPackager::new();

        let mut pipeline =
            Pipeline::new(&opts, Platform::Linux, toolchain(), &runner, &packager).unwrap();
        assert_eq!(pipeline.stage(), Stage::Idle);

        pipeline.run().unwrap();
        assert_eq!(pipeline.stage(), Stage::Done);

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);

        // Setup configure carries the version and digest.
        assert_eq!(calls[0][0], "cmake");
        assert!(calls[0].contains(&"-DRUBY_VER:STRING=3.2.5".to_string()));

        // Setup build fans out.
        assert_eq!(calls[1][1], "--build");
        assert!(calls[1].contains(&"--parallel".to_string()));
        assert!(calls[1].contains(&"8".to_string()));

        // Press configure carries both argument sets.
        assert!(calls[2].contains(&"-DRUBY_HASH:STRING=ef0610b498f60fb5cfd77b51adb3c10f4ca8ed9a17cb87c61e5bea314ac34a16".to_string()));
        assert!(calls[2].contains(&"-DPCKG:STRING=/tmp/bundle".to_string()));

        // Press build targets the press target.
        assert!(calls[3].contains(&"--target".to_string()));
        assert!(calls[3].contains(&PRESS_TARGET.to_string()));

        assert_eq!(
            packager.events(),
            vec!["generate_descriptor", "init", "deploy", "mkdwarfs"]
        );
    }

    #[test]
    #[serial]
    fn test_setup_configure_failure_is_101() {
        let opts = options();
        let runner = MockRunner::fail_on_call(1);
        let packager = RecordingPackager::new();

        let mut pipeline =
            Pipeline::new(&opts, Platform::Linux, toolchain(), &runner, &packager).unwrap();
        let err = pipeline.run().unwrap_err();

        let err = err.downcast_ref::<Error>().unwrap();
        assert_eq!(err.code(), 101);
        assert_eq!(pipeline.stage(), Stage::Failed(101));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    #[serial]
    fn test_setup_build_failure_stops_before_press() {
        let opts = options();
        let runner = MockRunner::fail_on_call(2);
        let packager = RecordingPackager::new();

        let mut pipeline =
            Pipeline::new(&opts, Platform::Linux, toolchain(), &runner, &packager).unwrap();
        let err = pipeline.run().unwrap_err();

        let err = err.downcast_ref::<Error>().unwrap();
        assert_eq!(err.code(), 102);
        assert_eq!(pipeline.stage(), Stage::Failed(102));

        // Press stages never execute, collaborators never run.
        assert_eq!(runner.calls().len(), 2);
        assert!(packager.events().is_empty());
    }

    #[test]
    #[serial]
    fn test_press_stage_failures_are_103_and_104() {
        for (call, code) in [(3, 103), (4, 104)] {
            let opts = options();
            let runner = MockRunner::fail_on_call(call);
            let packager = RecordingPackager::new();

            let mut pipeline =
                Pipeline::new(&opts, Platform::Linux, toolchain(), &runner, &packager).unwrap();
            let err = pipeline.run().unwrap_err();

            let err = err.downcast_ref::<Error>().unwrap();
            assert_eq!(err.code(), code);
            assert_eq!(pipeline.stage(), Stage::Failed(code));
            assert!(packager.events().is_empty());
        }
    }

    #[test]
    #[serial]
    fn test_validation_fails_before_any_subprocess() {
        let mut opts = options();
        opts.ruby = Some("3.0.0".into());
        let runner = MockRunner::ok();
        let packager = RecordingPackager::new();

        let err = Pipeline::new(&opts, Platform::Linux, toolchain(), &runner, &packager)
            .unwrap_err();
        let err = err.downcast_ref::<Error>().unwrap();
        assert_eq!(err.code(), 110);
        assert!(runner.calls().is_empty());
    }

    #[test]
    #[serial]
    fn test_collaborator_failure_propagates() {
        let opts = options();
        let runner = MockRunner::ok();
        let packager = RecordingPackager::failing_at("deploy");

        let mut pipeline =
            Pipeline::new(&opts, Platform::Linux, toolchain(), &runner, &packager).unwrap();
        let err = pipeline.run().unwrap_err();

        assert!(err.to_string().contains("deploy refused"));
        assert!(matches!(pipeline.stage(), Stage::Failed(_)));
        assert_eq!(packager.events(), vec!["generate_descriptor", "init", "deploy"]);
    }

    #[test]
    #[serial]
    fn test_build_env_fallbacks() {
        std::env::remove_var("CC");
        std::env::remove_var("CXX");
        std::env::remove_var("CXXFLAGS");

        let env = build_env(Platform::Linux, &ToolchainConfig::default());
        assert!(env.contains(&("CC".to_string(), "gcc".to_string())));
        assert!(env.contains(&("CXX".to_string(), "g++".to_string())));
        assert!(env.contains(&("CXXFLAGS".to_string(), String::new())));
    }

    #[test]
    #[serial]
    fn test_build_env_macos_flags() {
        std::env::set_var("CXXFLAGS", "-O2");

        let env = build_env(Platform::Macos, &ToolchainConfig::default());
        let flags = &env.iter().find(|(k, _)| k == "CXXFLAGS").unwrap().1;
        assert_eq!(flags, "-DTARGET_OS_SIMULATOR=0 -DTARGET_OS_IPHONE=0 -O2");

        std::env::remove_var("CXXFLAGS");
    }

    #[test]
    #[serial]
    fn test_build_env_config_precedence() {
        std::env::set_var("CC", "/usr/bin/cc-from-env");

        let config = ToolchainConfig {
            cc: Some(PathBuf::from("/usr/bin/clang")),
            cxx: None,
            cxxflags: vec!["-O3".into(), "-g".into()],
        };
        let env = build_env(Platform::Linux, &config);

        assert!(env.contains(&("CC".to_string(), "/usr/bin/clang".to_string())));
        assert!(env.contains(&("CXXFLAGS".to_string(), "-O3 -g".to_string())));

        std::env::remove_var("CC");
    }
}
