//! Test doubles for ampoule unit tests.
//!
//! Provides a scripted [`CommandRunner`] and a recording [`Packager`] so
//! stage sequencing can be exercised without CMake, a staging tree, or a
//! dwarfs toolchain on the machine running the tests.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::error::Error;
use crate::layout::BuildLayout;
use crate::options::Options;
use crate::packager::{PackageDescriptor, Packager, Scenario, MOUNT_POINT};
use crate::runtime::RuntimeSpec;
use crate::util::process::CommandRunner;

/// Scripted command runner recording every invocation.
pub struct MockRunner {
    /// 1-based call index that fails; 0 means every call, `None` never.
    fail_on: Option<usize>,
    /// Outputs returned by successive successful calls; empty afterwards.
    outputs: Mutex<Vec<String>>,
    calls: Mutex<Vec<Vec<String>>>,
    ncores: usize,
}

impl MockRunner {
    /// Every call succeeds with empty output.
    pub fn ok() -> MockRunner {
        MockRunner {
            fail_on: None,
            outputs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            ncores: 4,
        }
    }

    /// Every call fails.
    pub fn failing() -> MockRunner {
        MockRunner {
            fail_on: Some(0),
            ..MockRunner::ok()
        }
    }

    /// The `n`th call (1-based) fails; the rest succeed.
    pub fn fail_on_call(n: usize) -> MockRunner {
        MockRunner {
            fail_on: Some(n),
            ..MockRunner::ok()
        }
    }

    /// Successive successful calls return these outputs, then empty text.
    pub fn with_outputs(outputs: &[&str]) -> MockRunner {
        MockRunner {
            outputs: Mutex::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
            ..MockRunner::ok()
        }
    }

    pub fn with_ncores(mut self, ncores: usize) -> MockRunner {
        self.ncores = ncores;
        self
    }

    /// Every invocation seen so far, as argument vectors.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run_captured(&self, argv: &[String]) -> Result<String, Error> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(argv.to_vec());
        let index = calls.len();
        drop(calls);

        match self.fail_on {
            Some(0) => Err(Error::SubprocessFailed {
                command: argv.join(" "),
                output: "scripted failure".to_string(),
            }),
            Some(n) if n == index => Err(Error::SubprocessFailed {
                command: argv.join(" "),
                output: "scripted failure".to_string(),
            }),
            _ => Ok(self.outputs.lock().unwrap().pop().unwrap_or_default()),
        }
    }

    fn ncores(&self) -> usize {
        self.ncores
    }
}

/// Packager recording collaborator calls in order, optionally failing at
/// a named step.
pub struct RecordingPackager {
    events: Mutex<Vec<&'static str>>,
    fail_at: Option<&'static str>,
}

impl RecordingPackager {
    pub fn new() -> RecordingPackager {
        RecordingPackager {
            events: Mutex::new(Vec::new()),
            fail_at: None,
        }
    }

    /// Fails when the named step (`"init"`, `"deploy"`, ...) is reached.
    pub fn failing_at(step: &'static str) -> RecordingPackager {
        RecordingPackager {
            events: Mutex::new(Vec::new()),
            fail_at: Some(step),
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, step: &'static str) -> Result<()> {
        self.events.lock().unwrap().push(step);
        if self.fail_at == Some(step) {
            bail!("{} refused", step);
        }
        Ok(())
    }
}

impl Default for RecordingPackager {
    fn default() -> Self {
        RecordingPackager::new()
    }
}

impl Packager for RecordingPackager {
    fn generate_descriptor(
        &self,
        options: &Options,
        spec: &RuntimeSpec,
        layout: &BuildLayout,
        scenario: &Scenario,
    ) -> Result<PackageDescriptor> {
        self.record("generate_descriptor")?;
        Ok(PackageDescriptor {
            ruby_version: spec.version().to_string(),
            ruby_api_version: spec.api_version(),
            mount_point: MOUNT_POINT.to_string(),
            entry_point: scenario.fs_entrance.clone(),
            root: layout.root.clone(),
            package: layout.package.clone().unwrap_or_default(),
            log_level: options.log_level,
        })
    }

    fn init(&self, _stash: &Path, _src: &Path, _pre: &Path, _bin: &Path) -> Result<()> {
        self.record("init")
    }

    fn deploy(
        &self,
        _src: &Path,
        _pre: &Path,
        _spec: &RuntimeSpec,
        _root: &Path,
        _entry_point: &Path,
        _cwd: &Path,
    ) -> Result<()> {
        self.record("deploy")
    }

    fn mkdwarfs(
        &self,
        _deps_bin: &Path,
        _image: &Path,
        _src: &Path,
        _descriptor: &PackageDescriptor,
    ) -> Result<()> {
        self.record("mkdwarfs")
    }
}
