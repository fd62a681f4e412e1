//! Configure-argument assembly for the setup and press stages.
//!
//! Pure assembly, no I/O: the orchestrator owns execution. Arguments are
//! built as literal vectors for shell-free execution; the rendered
//! command-line form double-quotes every value, the one quoting style both
//! Unix and Windows shells accept, so transcripts can be replayed on
//! either.

use anyhow::Result;

use crate::layout::BuildLayout;
use crate::options::Options;
use crate::runtime::RuntimeSpec;

/// Configure arguments for the setup stage: release build type, runtime
/// version and digest, dependency dir, generator, and the build/source
/// trees.
pub fn setup_args(layout: &BuildLayout, spec: &RuntimeSpec) -> Vec<String> {
    vec![
        "-DCMAKE_BUILD_TYPE=Release".to_string(),
        format!("-DRUBY_VER:STRING={}", spec.version()),
        format!("-DRUBY_HASH:STRING={}", spec.digest()),
        format!("-DDEPS:STRING={}", layout.deps.display()),
        "-G".to_string(),
        layout.generator.to_string(),
        "-B".to_string(),
        layout.output.display().to_string(),
        "-S".to_string(),
        layout.source.display().to_string(),
    ]
}

/// Configure arguments for the press stage: project root, entry point,
/// package path, and image log verbosity.
pub fn press_args(layout: &BuildLayout, options: &Options) -> Result<Vec<String>> {
    let entry_point = options.entry_point()?;
    let package = layout
        .package
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no package path in layout"))?;

    Ok(vec![
        format!("-DROOT:STRING={}", layout.root.display()),
        format!("-DENTRANCE:STRING={}", entry_point.display()),
        format!("-DPCKG:STRING={}", package.display()),
        format!("-DLOG_LEVEL:STRING={}", options.log_level),
    ])
}

/// Render an invocation as a single replayable command line with every
/// value double-quoted.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];

    for arg in args {
        if let Some(eq) = arg.find('=') {
            let (key, value) = arg.split_at(eq + 1);
            parts.push(format!("{}\"{}\"", key, value));
        } else if arg.starts_with('-') {
            parts.push(arg.clone());
        } else {
            parts.push(format!("\"{}\"", arg));
        }
    }

    parts.join(" ")
}

/// Operator announce block printed before the press stage runs.
pub fn press_announce(layout: &BuildLayout, spec: &RuntimeSpec, options: &Options) -> String {
    let entry_point = options
        .entry_point
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let package = layout
        .package
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    format!(
        "Running ampoule press at {}\n\
         \x20  Ruby version:            '{}'\n\
         \x20  Project root:            '{}'\n\
         \x20  Application entry point: '{}'\n\
         \x20  Package file name:       '{}'\n\
         \x20  Logging level:           '{}'",
        layout.prefix.display(),
        spec.version(),
        layout.root.display(),
        entry_point,
        package,
        options.log_level,
    )
}
