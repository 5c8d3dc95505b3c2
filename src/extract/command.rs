//! Runs the external query engine as a child process with a deadline.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use geoscout_common::{Error, Result};
use tokio::process::Command;

/// Default deadline for one query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Standard output (lossy UTF-8).
    pub stdout: String,
    /// Standard error (lossy UTF-8).
    pub stderr: String,
}

/// Builder for one external tool invocation.
///
/// # Example
///
/// ```no_run
/// use geoscout::extract::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> geoscout_common::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("duckdb"))
///     .args(["-json", "-c"])
///     .arg("SELECT 42 AS answer")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run to completion and capture output.
    ///
    /// # Errors
    ///
    /// [`Error::Tool`] if the process cannot be spawned, exits non-zero
    /// (message carries stderr), or exceeds the deadline (the child is killed).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool = self.tool_name();

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(&tool, format!("failed to spawn: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::tool(&tool, format!("I/O error waiting for process: {e}")))
            }
            Err(_elapsed) => {
                return Err(Error::tool(&tool, format!("timed out after {:?}", self.timeout)))
            }
        };

        let out = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !out.status.success() {
            return Err(Error::tool(
                tool,
                format!("exited with status {}: {}", out.status, out.stderr.trim()),
            ));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        // Minimal environments may lack echo.
        if let Ok(out) = output {
            assert!(out.status.success());
            assert!(out.stdout.trim().contains("hello"));
        }
    }

    #[tokio::test]
    async fn args_are_passed_in_order() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .args(["-json", "-c"])
            .arg("SELECT 1")
            .execute()
            .await;

        if let Ok(out) = output {
            assert_eq!(out.stdout.trim(), "-json -c SELECT 1");
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let err = ToolCommand::new(PathBuf::from("nonexistent_tool_geoscout_42"))
            .execute()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(
            err.contains("timed out") || err.contains("failed to spawn"),
            "unexpected error: {err}"
        );
    }
}
