use std::ffi::OsStr;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::trace;

/// A host command that could not be spawned or exited non-zero.
#[derive(Debug, thiserror::Error)]
#[error("`{command}` failed: {detail}")]
pub struct CommandError {
    pub command: String,
    pub detail: String,
}

/// How host commands (and the dial daemon) are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Prefix with non-interactive `sudo -n`.
    #[default]
    Sudo,
    /// Run as the current user.
    User,
}

impl Privilege {
    /// Build a command that runs `program` with this privilege.
    pub fn command(self, program: impl AsRef<OsStr>) -> Command {
        match self {
            Self::Sudo => {
                let mut cmd = Command::new("sudo");
                cmd.arg("-n").arg(program);
                cmd
            }
            Self::User => Command::new(program),
        }
    }
}

/// Shell-like rendering of an invocation, for traces and errors.
fn display_line(program: &str, args: &[&str], privilege: Privilege) -> String {
    let mut parts = Vec::with_capacity(args.len() + 3);
    if privilege == Privilege::Sudo {
        parts.extend_from_slice(&["sudo", "-n"]);
    }
    parts.push(program);
    parts.extend_from_slice(args);
    parts.join(" ")
}

/// Run `program` to completion and return its trimmed stdout.
///
/// On failure the error carries stderr, or the exit status when stderr is
/// empty.
pub async fn exec(
    program: &str,
    args: &[&str],
    privilege: Privilege,
) -> Result<String, CommandError> {
    let line = display_line(program, args, privilege);
    trace!(command = %line, "exec");

    let output = privilege
        .command(program)
        .args(args)
        .output()
        .await
        .map_err(|e| CommandError {
            command: line.clone(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CommandError {
            command: line,
            detail: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        })
    }
}

/// Best-effort [`exec`]: failures are traced and dropped.
pub async fn exec_ignore_errors(program: &str, args: &[&str], privilege: Privilege) {
    if let Err(e) = exec(program, args, privilege).await {
        trace!(command = %e.command, detail = %e.detail, "best-effort command failed");
    }
}
