//! Shell execution and the OS process-control command table

use crate::error::{Error, Result};
use anyhow::Context;
use std::path::Path;
use std::process::Command;

/// OS name the verified command templates target.
pub const WINDOWS: &str = "Windows";

/// Synchronous command execution seam.
///
/// The exit code is the only observable the facade relies on; tests
/// substitute stubs that script codes and record invocations.
pub trait CommandRunner {
    /// Run a command line through the system shell, returning its exit code.
    fn run(&self, command: &str) -> Result<i32>;

    /// Run a program directly and capture its stdout.
    fn output(&self, program: &Path, args: &[&str], dir: Option<&Path>) -> Result<String>;
}

/// Runs commands through the host's real shell.
pub struct SystemShell;

impl CommandRunner for SystemShell {
    fn run(&self, command: &str) -> Result<i32> {
        let status = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", command]).status()
        } else {
            Command::new("sh").args(["-c", command]).status()
        }
        .with_context(|| format!("failed to run `{}`", command))?;
        Ok(status.code().unwrap_or(-1))
    }

    fn output(&self, program: &Path, args: &[&str], dir: Option<&Path>) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .with_context(|| format!("failed to run {}", program.display()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── Process-control command templates ───────────────────────────────────────
//
// Keyed by OS type. Only the Windows templates are verified against a real
// host; every other OS gets an explicit unsupported error until verified
// commands are supplied, instead of a template that silently does the wrong
// thing.

/// Background-start command, with optional working directory and arguments.
pub(crate) fn start_command(
    os: &str,
    program: &str,
    working_dir: Option<&str>,
    args: Option<&str>,
) -> Result<String> {
    if os != WINDOWS {
        return Err(Error::unsupported_platform("start_program", os));
    }
    let prefix = working_dir
        .map(|d| format!("cd {} && ", d))
        .unwrap_or_default();
    let suffix = args.map(|a| format!(" {}", a)).unwrap_or_default();
    Ok(format!("{}START /B {}{}", prefix, program, suffix))
}

/// Process-list probe; exit code 0 means the image name is running.
pub(crate) fn check_command(os: &str, program: &str) -> Result<String> {
    if os != WINDOWS {
        return Err(Error::unsupported_platform("check_program_running", os));
    }
    Ok(format!(
        r#"tasklist /nh /fi "imagename eq {0}" | find /i "{0}" > nul"#,
        program
    ))
}

/// Forced kill by image name.
pub(crate) fn kill_command(os: &str, program: &str) -> Result<String> {
    if os != WINDOWS {
        return Err(Error::unsupported_platform("kill_program", os));
    }
    Ok(format!("Taskkill /IM {} /F", program))
}
