use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Executes a rendered automation script.  Implementations must report
/// spawn errors and non-zero exit status the same way; the retry loop
/// counts both as a failed attempt.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, source: &str) -> Result<()>;
}

/// Runs scripts through `osascript -`, piping the source via stdin so quotes
/// and newlines in the payload never meet a shell.
#[derive(Debug, Default)]
pub struct OsaRunner;

impl ScriptRunner for OsaRunner {
    fn run(&self, source: &str) -> Result<()> {
        let mut child = Command::new("osascript")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn osascript")?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(source.as_bytes())
                .context("failed to write script to osascript stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("osascript did not run to completion")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("osascript exited with {}: {}", output.status, stderr.trim());
        }

        Ok(())
    }
}
