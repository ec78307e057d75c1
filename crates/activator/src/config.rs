use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dial::AuthCodeFamily;
use dial_pppd::{DEFAULT_MTU, DEFAULT_PLUGIN, DEFAULT_SYSFS_NET, PppdConfig, Privilege};
use serde::{Deserialize, Serialize};

use crate::error::{ActivatorError, ActivatorResult};
use crate::username::UsernamePolicy;

const MIN_MTU: u16 = 576;
const MAX_MTU: u16 = 1500;

/// How long the interface lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Until the session is torn down. Stale-session cleanup by the next
    /// caller can then never hit a live session.
    #[default]
    HoldSession,
    /// Only around stale cleanup and MAC assignment.
    ReleaseEarly,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivatorConfig {
    pub listen: SocketAddr,
    /// Per-session pppd logs.
    pub log_dir: PathBuf,
    /// Per-interface lock files.
    pub lock_dir: PathBuf,
    /// JSON-lines activation records.
    pub records_path: PathBuf,
    /// Network configuration (mode, base interface, VLAN tags), re-read per
    /// request.
    pub network_config: PathBuf,
    pub lock_policy: LockPolicy,
    pub auth_code_family: AuthCodeFamily,
    pub validate_username_format: bool,
    pub max_body_bytes: usize,
    pub dial: DialConfig,
    pub username_policy: UsernamePolicy,
}

impl Default for ActivatorConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 5000)),
            log_dir: PathBuf::from("/var/log/pppoe"),
            lock_dir: PathBuf::from("/var/lock/pppoe-activator"),
            records_path: PathBuf::from("/var/lib/pppoe-activator/activations.jsonl"),
            network_config: PathBuf::from("/etc/pppoe-activator/network.yaml"),
            lock_policy: LockPolicy::default(),
            auth_code_family: AuthCodeFamily::default(),
            validate_username_format: true,
            max_body_bytes: 16 * 1024,
            dial: DialConfig::default(),
            username_policy: UsernamePolicy::default(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialConfig {
    pub pppd_binary: PathBuf,
    pub plugin: String,
    pub mtu: u16,
    pub mru: u16,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub term_grace_ms: u64,
    pub kill_grace_ms: u64,
    pub stale_settle_ms: u64,
    pub privilege: Privilege,
    pub require_carrier: bool,
    pub sysfs_net: PathBuf,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            pppd_binary: PathBuf::from("/usr/sbin/pppd"),
            plugin: DEFAULT_PLUGIN.to_string(),
            mtu: DEFAULT_MTU,
            mru: DEFAULT_MTU,
            timeout_secs: 20,
            poll_interval_ms: 1000,
            term_grace_ms: 3000,
            kill_grace_ms: 2000,
            stale_settle_ms: 1000,
            privilege: Privilege::default(),
            require_carrier: true,
            sysfs_net: PathBuf::from(DEFAULT_SYSFS_NET),
        }
    }
}

/// Load and validate the service config from a YAML file.
///
/// Relative paths in the config are resolved against the config file's parent directory.
pub async fn load(path: &Path) -> ActivatorResult<ActivatorConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ActivatorError::Config(format!("read {}: {e}", path.display())))?;
    let mut config: ActivatorConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| ActivatorError::Config(format!("parse {}: {e}", path.display())))?;
    if let Some(config_dir) = path.parent() {
        config.resolve_relative_paths(config_dir);
    }
    config.validate()?;
    Ok(config)
}

impl ActivatorConfig {
    fn resolve_relative_paths(&mut self, config_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = config_dir.join(&*p);
            }
        };
        resolve(&mut self.log_dir);
        resolve(&mut self.lock_dir);
        resolve(&mut self.records_path);
        resolve(&mut self.network_config);
        // A bare binary name is looked up on PATH.
        if self.dial.pppd_binary.components().count() > 1 {
            resolve(&mut self.dial.pppd_binary);
        }
    }

    fn validate(&self) -> ActivatorResult<()> {
        let dial = &self.dial;
        if dial.timeout_secs == 0 {
            return Err(ActivatorError::Config("dial.timeout_secs must be > 0".into()));
        }
        if dial.poll_interval_ms == 0 {
            return Err(ActivatorError::Config(
                "dial.poll_interval_ms must be > 0".into(),
            ));
        }
        if dial.poll_interval_ms > dial.timeout_secs.saturating_mul(1000) {
            return Err(ActivatorError::Config(
                "dial.poll_interval_ms must not exceed dial.timeout_secs".into(),
            ));
        }
        for (label, value) in [("mtu", dial.mtu), ("mru", dial.mru)] {
            if !(MIN_MTU..=MAX_MTU).contains(&value) {
                return Err(ActivatorError::Config(format!(
                    "dial.{label} {value} outside {MIN_MTU}..={MAX_MTU}"
                )));
            }
        }
        if dial.plugin.trim().is_empty() {
            return Err(ActivatorError::Config("dial.plugin must not be empty".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(ActivatorError::Config("max_body_bytes must be > 0".into()));
        }
        Ok(())
    }

    /// Backend settings derived from this config.
    pub fn pppd_config(&self) -> PppdConfig {
        let dial = &self.dial;
        PppdConfig {
            binary: dial.pppd_binary.clone(),
            plugin: dial.plugin.clone(),
            mtu: dial.mtu,
            mru: dial.mru,
            timeout: Duration::from_secs(dial.timeout_secs),
            poll_interval: Duration::from_millis(dial.poll_interval_ms),
            term_grace: Duration::from_millis(dial.term_grace_ms),
            kill_grace: Duration::from_millis(dial.kill_grace_ms),
            stale_settle: Duration::from_millis(dial.stale_settle_ms),
            log_dir: self.log_dir.clone(),
            privilege: dial.privilege,
            require_carrier: dial.require_carrier,
            auth_code_family: self.auth_code_family,
            sysfs_net: dial.sysfs_net.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn load_str(yaml: &str) -> ActivatorResult<ActivatorConfig> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activator.yaml");
        tokio::fs::write(&path, yaml).await.unwrap();
        load(&path).await
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let config = load_str("{}\n").await.unwrap();
        assert_eq!(config.lock_policy, LockPolicy::HoldSession);
        assert_eq!(config.auth_code_family, AuthCodeFamily::Ras);
        assert_eq!(config.dial.mtu, 1492);
        assert_eq!(config.dial.timeout_secs, 20);
        assert!(config.validate_username_format);
    }

    #[tokio::test]
    async fn load_full_config() {
        let yaml = r#"
listen: 127.0.0.1:8080
log_dir: logs
lock_dir: /run/lock/act
records_path: data/activations.jsonl
network_config: network.yaml
lock_policy: release_early
auth_code_family: symbolic
validate_username_format: false
dial:
  pppd_binary: pppd
  timeout_secs: 15
  poll_interval_ms: 500
  privilege: user
  require_carrier: false
username_policy:
  default_suffix: campus
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activator.yaml");
        tokio::fs::write(&path, yaml).await.unwrap();
        let config = load(&path).await.unwrap();

        assert_eq!(config.listen, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_dir, dir.path().join("logs"));
        assert_eq!(config.lock_dir, PathBuf::from("/run/lock/act"));
        assert_eq!(config.records_path, dir.path().join("data/activations.jsonl"));
        assert_eq!(config.network_config, dir.path().join("network.yaml"));
        assert_eq!(config.lock_policy, LockPolicy::ReleaseEarly);
        assert_eq!(config.auth_code_family, AuthCodeFamily::Symbolic);
        assert!(!config.validate_username_format);
        assert_eq!(config.dial.pppd_binary, PathBuf::from("pppd"));
        assert_eq!(config.dial.privilege, Privilege::User);
        assert_eq!(config.username_policy.default_suffix, "campus");

        let pppd = config.pppd_config();
        assert_eq!(pppd.timeout, Duration::from_secs(15));
        assert_eq!(pppd.poll_interval, Duration::from_millis(500));
        assert_eq!(pppd.log_dir, dir.path().join("logs"));
        assert!(!pppd.require_carrier);
        assert_eq!(pppd.auth_code_family, AuthCodeFamily::Symbolic);
    }

    #[tokio::test]
    async fn relative_binary_path_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activator.yaml");
        tokio::fs::write(&path, "dial:\n  pppd_binary: bin/pppd\n").await.unwrap();
        let config = load(&path).await.unwrap();
        assert_eq!(config.dial.pppd_binary, dir.path().join("bin/pppd"));
    }

    #[tokio::test]
    async fn zero_timeout_is_rejected() {
        let err = load_str("dial:\n  timeout_secs: 0\n").await.unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "{err}");
    }

    #[tokio::test]
    async fn poll_interval_longer_than_timeout_is_rejected() {
        let err = load_str("dial:\n  timeout_secs: 1\n  poll_interval_ms: 1500\n")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"), "{err}");
    }

    #[tokio::test]
    async fn mtu_out_of_range_is_rejected() {
        let err = load_str("dial:\n  mtu: 9000\n").await.unwrap_err();
        assert!(err.to_string().contains("mtu"), "{err}");
    }

    #[tokio::test]
    async fn unknown_lock_policy_is_parse_error() {
        let err = load_str("lock_policy: forever\n").await.unwrap_err();
        assert!(err.to_string().contains("parse"), "{err}");
    }

    #[tokio::test]
    async fn missing_file_is_config_error() {
        let err = load(Path::new("/nonexistent/activator.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActivatorError::Config(_)));
    }
}
