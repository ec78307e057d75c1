use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Physical,
    Vlan,
}

/// A candidate interface, recomputed per request from the network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceHandle {
    /// Kernel interface name (e.g. `enp3s0` or `enp3s0.2001`).
    pub name: String,
    pub kind: InterfaceKind,
    /// Physical trunk the interface lives on. Equals `name` for physical mode.
    pub base_interface: String,
    pub vlan_tag: Option<u16>,
}

impl InterfaceHandle {
    pub fn physical(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            base_interface: name.clone(),
            name,
            kind: InterfaceKind::Physical,
            vlan_tag: None,
        }
    }

    pub fn vlan(base: &str, tag: u16) -> Self {
        Self {
            name: format!("{base}.{tag}"),
            kind: InterfaceKind::Vlan,
            base_interface: base.to_string(),
            vlan_tag: Some(tag),
        }
    }
}

/// Fully-qualified login and password handed to the dial daemon.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A granted IP lease observed during a successful session.
#[derive(Debug, Clone)]
pub struct Lease {
    pub ip: Ipv4Addr,
    /// Point-to-point device the daemon bound (e.g. `ppp0`).
    pub device: String,
    pub log_path: PathBuf,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlan_handle_name() {
        let h = InterfaceHandle::vlan("enp3s0", 2001);
        assert_eq!(h.name, "enp3s0.2001");
        assert_eq!(h.base_interface, "enp3s0");
        assert_eq!(h.vlan_tag, Some(2001));
        assert_eq!(h.kind, InterfaceKind::Vlan);
    }

    #[test]
    fn physical_handle_is_its_own_base() {
        let h = InterfaceHandle::physical("eth1");
        assert_eq!(h.base_interface, "eth1");
        assert!(h.vlan_tag.is_none());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "2021001234@cdu".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("2021001234@cdu"));
        assert!(!shown.contains("hunter2"));
    }
}
