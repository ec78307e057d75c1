use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;

use crate::command::{Privilege, exec, exec_ignore_errors};

/// Signal the process group led by `pid`.
///
/// The daemon is spawned with `process_group(0)` so its PGID equals its PID.
/// Under `sudo` the group belongs to root, so the signal goes through
/// `sudo kill` as well. Returns whether the signal was delivered.
pub(crate) async fn signal_group(pid: u32, signal: Signal, privilege: Privilege) -> bool {
    match privilege {
        Privilege::User => match i32::try_from(pid) {
            Ok(raw) => killpg(Pid::from_raw(raw), signal).is_ok(),
            Err(_) => false,
        },
        Privilege::Sudo => {
            let sig = format!("-{}", signal as i32);
            let group = format!("-{pid}");
            exec("kill", &[&sig, "--", &group], privilege).await.is_ok()
        }
    }
}

/// Recursively kill a process and all its descendants (depth-first).
///
/// Used only when group signals did not take effect, e.g. a descendant that
/// moved itself into another process group.
pub(crate) async fn kill_process_tree(pid: u32, privilege: Privilege) {
    let pid_str = pid.to_string();
    if let Ok(stdout) = exec("pgrep", &["-P", &pid_str], Privilege::User).await {
        for line in stdout.lines() {
            if let Ok(child_pid) = line.trim().parse::<u32>() {
                Box::pin(kill_process_tree(child_pid, privilege)).await;
            }
        }
    }
    exec_ignore_errors("kill", &["-9", &pid_str], privilege).await;
}

/// Kill every process whose full command line matches `pattern`.
///
/// Returns whether anything matched. `pkill` exits 1 when nothing matched,
/// which is indistinguishable from a failure here and reported as `false`.
pub(crate) async fn kill_matching(pattern: &str, privilege: Privilege) -> bool {
    exec("pkill", &["-KILL", "-f", pattern], privilege)
        .await
        .is_ok()
}
