//! Kernel link operations through sysfs and `ip`.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use dial::{DialError, MacAddress};
use tracing::{debug, info, warn};

use crate::command::{Privilege, exec, exec_ignore_errors};

#[derive(Debug, Clone)]
pub struct IpLink {
    sysfs_net: PathBuf,
    privilege: Privilege,
    program: String,
}

impl IpLink {
    pub fn new(sysfs_net: PathBuf, privilege: Privilege) -> Self {
        Self {
            sysfs_net,
            privilege,
            program: "ip".to_string(),
        }
    }

    /// Use another `ip` executable (default: `ip` from `PATH`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.sysfs_net.join(name))
            .await
            .unwrap_or(false)
    }

    /// Whether the kernel reports link. An unreadable flag (e.g. the interface
    /// is administratively down) counts as present.
    pub async fn has_carrier(&self, name: &str) -> bool {
        match tokio::fs::read_to_string(self.sysfs_net.join(name).join("carrier")).await {
            Ok(flag) => flag.trim() != "0",
            Err(e) => {
                debug!(iface = %name, error = %e, "carrier unreadable, assuming link");
                true
            }
        }
    }

    /// First IPv4 address on `device`, if any.
    pub async fn ipv4_address(&self, device: &str) -> Option<Ipv4Addr> {
        let out = exec(&self.program, &["-4", "-o", "addr", "show", "dev", device], Privilege::User)
            .await
            .ok()?;
        parse_inet(&out)
    }

    /// Bring the link down, set its hardware address, bring it up again.
    ///
    /// The link is brought back up even when the address change fails.
    pub async fn set_mac(&self, name: &str, mac: MacAddress) -> dial::Result<()> {
        let mac_str = mac.to_string();
        let failed = |e: crate::command::CommandError| DialError::MacAssignment {
            interface: name.to_string(),
            mac,
            detail: e.to_string(),
        };

        exec(&self.program, &["link", "set", "dev", name, "down"], self.privilege)
            .await
            .map_err(failed)?;
        if let Err(e) = exec(
            &self.program,
            &["link", "set", "dev", name, "address", mac_str.as_str()],
            self.privilege,
        )
        .await
        {
            warn!(iface = %name, mac = %mac, error = %e, "MAC change rejected, restoring link");
            exec_ignore_errors(&self.program, &["link", "set", "dev", name, "up"], self.privilege)
                .await;
            return Err(failed(e));
        }
        exec(&self.program, &["link", "set", "dev", name, "up"], self.privilege)
            .await
            .map_err(failed)?;
        info!(iface = %name, mac = %mac, "MAC assigned");
        Ok(())
    }

    /// Remove a leftover point-to-point device. Best effort.
    pub async fn delete(&self, device: &str) {
        exec_ignore_errors(&self.program, &["link", "delete", device], self.privilege).await;
    }

    /// Create `base.tag` and bring it up.
    pub async fn create_vlan(&self, base: &str, tag: u16) -> dial::Result<String> {
        let name = format!("{base}.{tag}");
        let tag_str = tag.to_string();
        let to_error = |e: crate::command::CommandError| {
            DialError::Configuration(format!("create VLAN {name}: {}", e.detail))
        };
        exec(
            &self.program,
            &["link", "add", "link", base, "name", &name, "type", "vlan", "id", &tag_str],
            self.privilege,
        )
        .await
        .map_err(to_error)?;
        exec(&self.program, &["link", "set", "dev", &name, "up"], self.privilege)
            .await
            .map_err(to_error)?;
        info!(iface = %name, "VLAN sub-interface created");
        Ok(name)
    }
}

/// Extract the first address from `ip -4 -o addr show` output.
fn parse_inet(output: &str) -> Option<Ipv4Addr> {
    let mut tokens = output.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "inet" {
            let cidr = tokens.next()?;
            let addr = cidr.split_once('/').map_or(cidr, |(a, _)| a);
            return addr.parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn sysfs() -> (tempfile::TempDir, IpLink) {
        let dir = tempfile::tempdir().unwrap();
        let link = IpLink::new(dir.path().to_path_buf(), Privilege::User);
        (dir, link)
    }

    #[test]
    fn parse_inet_point_to_point() {
        let out = "7: ppp0    inet 10.21.3.44 peer 10.21.0.1/32 scope global ppp0\\       valid_lft forever preferred_lft forever";
        assert_eq!(parse_inet(out), Some(Ipv4Addr::new(10, 21, 3, 44)));
    }

    #[test]
    fn parse_inet_with_prefix() {
        let out = "2: eth0    inet 192.168.1.5/24 brd 192.168.1.255 scope global eth0";
        assert_eq!(parse_inet(out), Some(Ipv4Addr::new(192, 168, 1, 5)));
    }

    #[test]
    fn parse_inet_empty_output() {
        assert_eq!(parse_inet(""), None);
        assert_eq!(parse_inet("7: ppp0 inet6 fe80::1/64 scope link"), None);
    }

    #[tokio::test]
    async fn exists_follows_sysfs_entry() {
        let (dir, link) = sysfs();
        tokio::fs::create_dir(dir.path().join("eth0")).await.unwrap();
        assert!(link.exists("eth0").await);
        assert!(!link.exists("eth0.100").await);
    }

    #[tokio::test]
    async fn carrier_zero_means_no_link() {
        let (dir, link) = sysfs();
        let iface = dir.path().join("eth0");
        tokio::fs::create_dir(&iface).await.unwrap();

        tokio::fs::write(iface.join("carrier"), b"0\n").await.unwrap();
        assert!(!link.has_carrier("eth0").await);

        tokio::fs::write(iface.join("carrier"), b"1\n").await.unwrap();
        assert!(link.has_carrier("eth0").await);
    }

    #[tokio::test]
    async fn unreadable_carrier_counts_as_present() {
        let (_dir, link) = sysfs();
        assert!(link.has_carrier("eth9").await);
    }

    /// Fake `ip` that appends its arguments to `calls` and rejects address
    /// changes when `reject_address` is set.
    fn fake_ip(dir: &Path, reject_address: bool) -> (PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let calls = dir.join("calls");
        let script = dir.join("fake-ip");
        let reject = if reject_address {
            r#"for a in "$@"; do
  if [ "$a" = address ]; then echo "RTNETLINK answers: Operation not permitted" >&2; exit 2; fi
done"#
        } else {
            ""
        };
        std::fs::write(
            &script,
            format!("#!/bin/bash\necho \"$*\" >> '{}'\n{reject}\nexit 0\n", calls.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script, calls)
    }

    fn recorded(calls: &Path) -> Vec<String> {
        std::fs::read_to_string(calls)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[tokio::test]
    async fn set_mac_runs_down_address_up() {
        let (dir, link) = sysfs();
        let (ip, calls) = fake_ip(dir.path(), false);
        let link = link.with_program(ip.to_str().unwrap());
        let mac = MacAddress::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

        link.set_mac("eth0.100", mac).await.unwrap();

        assert_eq!(
            recorded(&calls),
            [
                "link set dev eth0.100 down",
                "link set dev eth0.100 address 02:11:22:33:44:55",
                "link set dev eth0.100 up",
            ]
        );
    }

    #[tokio::test]
    async fn rejected_address_still_brings_link_up() {
        let (dir, link) = sysfs();
        let (ip, calls) = fake_ip(dir.path(), true);
        let link = link.with_program(ip.to_str().unwrap());
        let mac = MacAddress::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

        let err = link.set_mac("eth0.100", mac).await.unwrap_err();

        match err {
            DialError::MacAssignment {
                interface,
                mac: attempted,
                detail,
            } => {
                assert_eq!(interface, "eth0.100");
                assert_eq!(attempted, mac);
                assert!(detail.contains("Operation not permitted"), "{detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
        let calls = recorded(&calls);
        assert_eq!(calls.last().map(String::as_str), Some("link set dev eth0.100 up"));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn ipv4_address_of_missing_device_is_none() {
        let (_dir, link) = sysfs();
        assert_eq!(link.ipv4_address("ppp-does-not-exist").await, None);
    }
}
