use std::path::PathBuf;
use std::time::Duration;

use dial::AuthCodeFamily;

use crate::command::Privilege;

pub const DEFAULT_PLUGIN: &str = "rp-pppoe.so";
pub const DEFAULT_MTU: u16 = 1492;
pub const DEFAULT_SYSFS_NET: &str = "/sys/class/net";

#[derive(Debug, Clone)]
pub struct PppdConfig {
    /// pppd binary, absolute or looked up on `PATH`.
    pub binary: PathBuf,
    /// PPPoE plugin passed as `plugin <name>`.
    pub plugin: String,
    pub mtu: u16,
    pub mru: u16,
    /// Upper bound on waiting for an IP lease.
    pub timeout: Duration,
    /// Sleep between log/address polls.
    pub poll_interval: Duration,
    /// Wait after SIGTERM before escalating.
    pub term_grace: Duration,
    /// Wait after SIGKILL before falling back to per-pid kills.
    pub kill_grace: Duration,
    /// Pause after killing a stale daemon so the access concentrator drops
    /// the old session before a new discovery starts.
    pub stale_settle: Duration,
    /// Directory receiving per-session daemon logs.
    pub log_dir: PathBuf,
    pub privilege: Privilege,
    /// Skip candidates whose kernel carrier flag reads 0.
    pub require_carrier: bool,
    pub auth_code_family: AuthCodeFamily,
    /// Root of the per-interface sysfs tree.
    pub sysfs_net: PathBuf,
}

impl Default for PppdConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/sbin/pppd"),
            plugin: DEFAULT_PLUGIN.to_string(),
            mtu: DEFAULT_MTU,
            mru: DEFAULT_MTU,
            timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(1),
            term_grace: Duration::from_secs(3),
            kill_grace: Duration::from_secs(2),
            stale_settle: Duration::from_secs(1),
            log_dir: PathBuf::from("/var/log/pppoe"),
            privilege: Privilege::Sudo,
            require_carrier: true,
            auth_code_family: AuthCodeFamily::Ras,
            sysfs_net: PathBuf::from(DEFAULT_SYSFS_NET),
        }
    }
}
