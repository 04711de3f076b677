//! Subprocess execution
//!
//! All external collaborators (package managers, rustup, cargo) are driven
//! through this module:
//! - Checking that a tool is installed
//! - Running a command to completion with captured output
//! - Turning a non-zero exit into an error carrying the exit code and stderr
//!
//! Child processes are killed when their future is dropped, so a cancelled
//! job never leaves a compiler or installer running behind it.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Lines of stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

/// Checks if a tool is installed by running `<program> --version`
pub async fn check_tool_available(program: &str) -> Result<String> {
    let mut command = Command::new(program);
    command.arg("--version");

    let stdout = run(command, &format!("{} --version", program))
        .await
        .with_context(|| format!("{} is not available. Is it installed?", program))?;

    let version = stdout.trim().to_string();
    info!("{} is available: {}", program, version);

    Ok(version)
}

/// Runs a command to completion and returns its stdout
///
/// A non-zero exit code is an error carrying the code and the tail of stderr.
///
/// # Arguments
/// * `command` - Fully configured command (program, args, cwd, env)
/// * `description` - Short label used in logs and errors, e.g. "apt-get install"
pub async fn run(mut command: Command, description: &str) -> Result<String> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!("exec: {:?}", command.as_std());

    let output = command
        .output()
        .await
        .with_context(|| format!("Failed to execute {}", description))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", description, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", description, stderr.trim());
    }

    if !output.status.success() {
        let error_msg = format!(
            "{} exited with code {}: {}",
            description,
            exit_code,
            stderr_tail(&stderr)
        );
        error!("{}", error_msg);
        anyhow::bail!("{}", error_msg);
    }

    Ok(stdout)
}

/// Last few lines of stderr, where compilers and installers put the actual error
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
