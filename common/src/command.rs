//! Command execution utilities
//!
//! Provides consistent command execution with proper error handling and logging.

use anyhow::{anyhow, Context, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Result of a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Turn a non-zero exit into an error naming the command.
    pub fn into_checked(self, cmd: &str) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            let code = self
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            Err(anyhow!("{} failed (exit {}): {}", cmd, code, self.stderr))
        }
    }
}

/// Run a command and return its output.
///
/// This is a low-level function that returns both stdout and stderr.
/// Use `run_checked` if you want to treat non-zero exit as an error.
pub async fn run(cmd: &str, args: &[&str]) -> Result<CommandOutput> {
    run_with_env(cmd, args, &[]).await
}

/// Run a command with extra environment variables set on the child only.
///
/// Values are never logged, so this is the way to hand secrets such as
/// `PGPASSWORD` to a PostgreSQL client binary.
#[instrument(skip_all, fields(cmd = %cmd))]
pub async fn run_with_env(
    cmd: &str,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<CommandOutput> {
    debug!(
        args = ?args,
        env = ?envs.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
        "Running command"
    );

    let output = Command::new(cmd)
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .output()
        .await
        .context(format!("Failed to execute {}", cmd))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

/// Run a command with stdin fed from `input`.
///
/// Keeps statements that carry secrets out of argv and the debug log.
#[instrument(skip_all, fields(cmd = %cmd))]
pub async fn run_with_input(cmd: &str, args: &[&str], input: &str) -> Result<CommandOutput> {
    debug!(args = ?args, input_len = input.len(), "Running command with stdin");

    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context(format!("Failed to spawn {}", cmd))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .await
            .context(format!("Failed to write stdin of {}", cmd))?;
    }

    let output = child
        .wait_with_output()
        .await
        .context(format!("Failed to wait for {}", cmd))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

/// Run a command with inherited stdio and wait for its exit status.
///
/// Use this for commands that leave a daemon behind (`pg_ctl start`): the
/// daemon keeps captured pipes open, so `run` would never see EOF.
pub async fn run_inherited(cmd: &str, args: &[&str]) -> Result<()> {
    debug!(cmd, args = ?args, "Running command with inherited stdio");

    let status = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .await
        .context(format!("Failed to execute {}", cmd))?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("{} failed with status: {}", cmd, status))
    }
}

/// Run a command and return stdout if successful, error otherwise.
///
/// # Example
/// ```ignore
/// let version = run_checked("pg_ctl", &["--version"]).await?;
/// ```
pub async fn run_checked(cmd: &str, args: &[&str]) -> Result<String> {
    run(cmd, args).await?.into_checked(cmd)
}

/// Run a pg_ctl command.
///
/// # Example
/// ```ignore
/// pg_ctl(&["-D", "/var/lib/postgresql/data", "-m", "fast", "-w", "stop"]).await?;
/// ```
pub async fn pg_ctl(args: &[&str]) -> Result<String> {
    run_checked("pg_ctl", args).await
}

/// Probe with pg_isready - returns Ok(true) if the server accepts connections.
///
/// Spawn errors are returned as Err so a missing binary is not mistaken for
/// an unreachable host.
pub async fn pg_isready_probe(args: &[&str]) -> Result<bool> {
    let output = run("pg_isready", args).await?;
    Ok(output.success)
}

/// Run a psql command.
///
/// # Example
/// ```ignore
/// let result = psql(&["-Atc", "SELECT 1"]).await?;
/// ```
pub async fn psql(args: &[&str]) -> Result<String> {
    run_checked("psql", args).await
}
