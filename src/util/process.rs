//! Subprocess execution.
//!
//! External commands run as literal argument vectors, never through a
//! shell. Stdout and stderr are captured through a single pipe so
//! build-tool diagnostics stay in their original interleaving, and every
//! invocation is echoed first so a failed build leaves a reproducible
//! transcript.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::platform::Platform;

/// Core count reported when the platform probe fails.
pub const NCORES_FALLBACK: usize = 4;

/// Executes external commands for the pipeline.
///
/// A trait so stage sequencing can be exercised against a scripted runner
/// in tests; production code uses [`SystemRunner`].
pub trait CommandRunner {
    /// Run `argv`, echoing the invocation and capturing combined
    /// stdout+stderr. Returns the captured text with trailing newlines
    /// stripped. Non-zero exit prints the captured output and fails with
    /// [`Error::SubprocessFailed`] carrying the same text.
    fn run_captured(&self, argv: &[String]) -> Result<String>;

    /// Number of cores to hand to `--parallel`. Never fails.
    fn ncores(&self) -> usize;
}

/// Production runner backed by `std::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    platform: Platform,
}

impl SystemRunner {
    pub fn new(platform: Platform) -> SystemRunner {
        SystemRunner { platform }
    }
}

impl CommandRunner for SystemRunner {
    fn run_captured(&self, argv: &[String]) -> Result<String> {
        let cmdline = argv.join(" ");
        println!("   ... @ {}", cmdline);

        let captured = capture_combined(argv).map_err(|e| {
            tracing::debug!("failed to spawn `{}`: {}", cmdline, e);
            Error::SubprocessFailed {
                command: cmdline.clone(),
                output: e.to_string(),
            }
        })?;

        if !captured.success {
            println!("{}", captured.text);
            return Err(Error::SubprocessFailed {
                command: cmdline,
                output: captured.text,
            });
        }

        Ok(captured.text)
    }

    fn ncores(&self) -> usize {
        let probe: &[&str] = match self.platform {
            Platform::Macos => &["sysctl", "-n", "hw.ncpu"],
            _ => &["nproc", "--all"],
        };
        let argv: Vec<String> = probe.iter().map(|s| s.to_string()).collect();

        match capture_combined(&argv) {
            Ok(out) if out.success => out.text.trim().parse().unwrap_or(NCORES_FALLBACK),
            _ => NCORES_FALLBACK,
        }
    }
}

struct Captured {
    text: String,
    success: bool,
}

/// Spawn `argv` with stdout and stderr funneled into one pipe, preserving
/// stream order, and wait for completion.
fn capture_combined(argv: &[String]) -> std::io::Result<Captured> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| std::io::Error::other("empty command vector"))?;

    let (mut reader, writer) = std::io::pipe()?;
    let writer_err = writer.try_clone()?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_err);

    let mut child = cmd.spawn()?;
    // The Command still holds the parent's pipe handles; drop it so the
    // reader sees EOF once the child exits.
    drop(cmd);

    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let status = child.wait()?;

    Ok(Captured {
        text: chomp(String::from_utf8_lossy(&raw).into_owned()),
        success: status.success(),
    })
}

/// Strip trailing newline characters, `chomp`-style.
fn chomp(mut s: String) -> String {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
    s
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> SystemRunner {
        SystemRunner::new(Platform::host())
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_captured_success() {
        let out = runner().run_captured(&argv(&["echo", "hello"])).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_run_captured_failure_carries_output() {
        let err = runner()
            .run_captured(&argv(&["sh", "-c", "echo broken; exit 3"]))
            .unwrap_err();

        match err {
            Error::SubprocessFailed { command, output } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_captured_combines_streams() {
        let out = runner()
            .run_captured(&argv(&["sh", "-c", "echo out; echo err 1>&2; echo tail"]))
            .unwrap();
        assert_eq!(out, "out\nerr\ntail");
    }

    #[test]
    fn test_run_captured_spawn_failure() {
        let err = runner()
            .run_captured(&argv(&["ampoule-no-such-binary-xyzzy"]))
            .unwrap_err();
        assert!(matches!(err, Error::SubprocessFailed { .. }));
    }

    #[test]
    fn test_ncores_is_positive() {
        assert!(runner().ncores() >= 1);
    }

    #[test]
    fn test_chomp() {
        assert_eq!(chomp("hello\n".into()), "hello");
        assert_eq!(chomp("hello\r\n".into()), "hello");
        assert_eq!(chomp("hello".into()), "hello");
        assert_eq!(chomp("a\nb\n".into()), "a\nb");
    }
}
