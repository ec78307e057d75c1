use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::command::{Privilege, exec};
use crate::config::PppdConfig;

/// Host prerequisites that are missing, all reported together.
#[derive(Debug, thiserror::Error)]
#[error("prerequisites not met: {}", .problems.join("; "))]
pub struct PrerequisiteError {
    pub problems: Vec<String>,
}

/// Verify the host can run dial sessions.
///
/// Checks the pppd binary, the helper commands, sudo access when running
/// privileged, and that the log and lock directories are writable (creating
/// them if needed).
pub async fn check_prerequisites(
    config: &PppdConfig,
    lock_dir: &Path,
) -> Result<(), PrerequisiteError> {
    let mut problems = Vec::new();

    check_binary(&config.binary, &mut problems);
    check_required_commands(&mut problems);
    if config.privilege == Privilege::Sudo {
        check_sudo(&mut problems).await;
    }
    check_writable_dir(&config.log_dir, "log directory", &mut problems).await;
    check_writable_dir(lock_dir, "lock directory", &mut problems).await;

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PrerequisiteError { problems })
    }
}

fn check_binary(binary: &Path, problems: &mut Vec<String>) {
    let resolved: Option<PathBuf> = if binary.components().count() > 1 {
        binary.exists().then(|| binary.to_path_buf())
    } else {
        which::which(binary).ok()
    };
    let Some(path) = resolved else {
        problems.push(format!("pppd binary not found: {}", binary.display()));
        return;
    };
    if let Ok(meta) = path.metadata()
        && meta.permissions().mode() & 0o111 == 0
    {
        problems.push(format!("pppd binary is not executable: {}", path.display()));
    }
}

fn check_required_commands(problems: &mut Vec<String>) {
    for cmd in ["ip", "pkill", "pgrep", "kill"] {
        if which::which(cmd).is_err() {
            problems.push(format!("required command not found: {cmd}"));
        }
    }
}

async fn check_sudo(problems: &mut Vec<String>) {
    if exec("sudo", &["-n", "true"], Privilege::User).await.is_err() {
        problems.push(
            "passwordless sudo required for pppd and link configuration; \
             configure sudoers or set privilege: user"
                .to_string(),
        );
    }
}

async fn check_writable_dir(dir: &Path, label: &str, problems: &mut Vec<String>) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        problems.push(format!("cannot create {label} {}: {e}", dir.display()));
        return;
    }
    let probe = dir.join(".write-probe");
    match tokio::fs::write(&probe, b"").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
        }
        Err(e) => problems.push(format!("{label} not writable {}: {e}", dir.display())),
    }
}
