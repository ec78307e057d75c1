//! One dial daemon run: spawn, wait for a lease, tear down.

use std::ffi::OsString;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use dial::{Credentials, DialError};
use nix::sys::signal::Signal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::command::Privilege;
use crate::config::PppdConfig;
use crate::link::IpLink;
use crate::process::{kill_process_tree, signal_group};

/// Result of waiting for a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Lease { device: String, ip: Ipv4Addr },
    /// The daemon exited before a lease appeared. pppd runs with `nodetach`,
    /// so exit is final.
    Exited(Option<i32>),
    TimedOut,
}

/// A running (or finished) dial daemon bound to one interface.
#[derive(Debug)]
pub struct DialSession {
    interface: String,
    log_path: PathBuf,
    started_at: Instant,
    child: Option<Child>,
    ppp_device: Option<String>,
    privilege: Privilege,
    term_grace: Duration,
    kill_grace: Duration,
}

/// pppd argument vector. The interface follows the plugin, which is what the
/// stale-session pattern in the backend matches on.
pub(crate) fn pppd_args(
    config: &PppdConfig,
    interface: &str,
    credentials: &Credentials,
    log_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "plugin",
        config.plugin.as_str(),
        interface,
        "user",
        credentials.username.as_str(),
        "password",
        credentials.password.as_str(),
        "mtu",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(config.mtu.to_string().into());
    args.push("mru".into());
    args.push(config.mru.to_string().into());
    for flag in ["noauth", "usepeerdns", "nodetach", "logfile"] {
        args.push(flag.into());
    }
    args.push(log_path.as_os_str().to_owned());
    args.push("debug".into());
    args
}

impl DialSession {
    /// Create the session log and spawn pppd on `interface`.
    pub async fn spawn(
        config: &PppdConfig,
        interface: &str,
        credentials: &Credentials,
        log_path: PathBuf,
    ) -> dial::Result<Self> {
        let mut cmd = config.privilege.command(&config.binary);
        cmd.args(pppd_args(config, interface, credentials, &log_path));
        Self::launch(cmd, interface, log_path, config).await
    }

    /// Spawn an already-built daemon command.
    pub(crate) async fn launch(
        mut cmd: Command,
        interface: &str,
        log_path: PathBuf,
        config: &PppdConfig,
    ) -> dial::Result<Self> {
        tokio::fs::write(&log_path, b"").await.map_err(|e| {
            DialError::Spawn(format!("create log {}: {e}", log_path.display()))
        })?;

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DialError::Spawn(format!("spawn dial daemon: {e}")))?;

        forward_output(interface, &mut child);
        info!(
            iface = %interface,
            pid = child.id().unwrap_or_default(),
            log = %log_path.display(),
            "dial daemon started"
        );

        Ok(Self {
            interface: interface.to_string(),
            log_path,
            started_at: Instant::now(),
            child: Some(child),
            ppp_device: None,
            privilege: config.privilege,
            term_grace: config.term_grace,
            kill_grace: config.kill_grace,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-to-point device learned from the log, if any.
    pub fn ppp_device(&self) -> Option<&str> {
        self.ppp_device.as_deref()
    }

    /// Poll the log and the kernel until a lease appears, the daemon exits, or
    /// `timeout` elapses. The first tick happens after one `poll_interval`.
    pub async fn wait_for_lease(
        &mut self,
        link: &IpLink,
        timeout: Duration,
        poll_interval: Duration,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            tokio::time::sleep(poll_interval).await;

            if self.ppp_device.is_none() {
                // Zero-length or not-yet-created logs are normal early on.
                let log = tokio::fs::read(&self.log_path).await.unwrap_or_default();
                self.ppp_device = find_ppp_device(&String::from_utf8_lossy(&log));
                if let Some(device) = &self.ppp_device {
                    debug!(iface = %self.interface, device = %device, "daemon bound device");
                }
            }
            if let Some(device) = &self.ppp_device
                && let Some(ip) = link.ipv4_address(device).await
            {
                info!(iface = %self.interface, device = %device, ip = %ip, "lease obtained");
                return WaitOutcome::Lease {
                    device: device.clone(),
                    ip,
                };
            }

            if let Some(status) = self.try_exit_status() {
                info!(iface = %self.interface, status = ?status, "dial daemon exited");
                return WaitOutcome::Exited(status.code());
            }
            if Instant::now() >= deadline {
                info!(iface = %self.interface, timeout = ?timeout, "no lease before timeout");
                return WaitOutcome::TimedOut;
            }
        }
    }

    fn try_exit_status(&mut self) -> Option<ExitStatus> {
        self.child.as_mut()?.try_wait().ok().flatten()
    }

    /// Stop the daemon and remove its device. Safe to call repeatedly.
    pub async fn teardown(&mut self, link: &IpLink) {
        if let Some(mut child) = self.child.take() {
            self.terminate(&mut child).await;
        }
        if let Some(device) = self.ppp_device.take() {
            link.delete(&device).await;
        }
    }

    /// SIGTERM, then SIGKILL, then per-pid kills of whatever is left.
    async fn terminate(&self, child: &mut Child) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        let Some(pid) = child.id() else {
            return;
        };

        signal_group(pid, Signal::SIGTERM, self.privilege).await;
        if tokio::time::timeout(self.term_grace, child.wait()).await.is_ok() {
            debug!(iface = %self.interface, pid, "dial daemon terminated");
            return;
        }

        signal_group(pid, Signal::SIGKILL, self.privilege).await;
        if tokio::time::timeout(self.kill_grace, child.wait()).await.is_ok() {
            debug!(iface = %self.interface, pid, "dial daemon killed");
            return;
        }

        warn!(iface = %self.interface, pid, "dial daemon unresponsive, killing process tree");
        kill_process_tree(pid, self.privilege).await;
        let _ = child.start_kill();
        if tokio::time::timeout(self.kill_grace, child.wait()).await.is_err() {
            warn!(iface = %self.interface, pid, "dial daemon still not reaped");
        }
    }
}

/// Device named in pppd's `Using interface pppN` line.
fn find_ppp_device(log: &str) -> Option<String> {
    log.lines().find_map(|line| {
        let (_, rest) = line.split_once("Using interface ")?;
        let device: String = rest
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect();
        let unit = device.strip_prefix("ppp")?;
        (!unit.is_empty() && unit.chars().all(|c| c.is_ascii_digit())).then_some(device)
    })
}

/// Forward daemon stdout/stderr lines into the service log.
fn forward_output(interface: &str, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        let iface = interface.to_owned();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.is_empty() {
                    debug!(iface = %iface, "pppd: {line}");
                }
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let iface = interface.to_owned();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.is_empty() {
                    warn!(iface = %iface, "pppd stderr: {line}");
                }
            }
        });
    }
}
