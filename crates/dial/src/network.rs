//! Persisted network configuration and candidate interface derivation.
//!
//! The configuration is edited elsewhere and re-read on every request, so
//! [`NetworkConfig::candidates`] is cheap and pure. Kernel existence is checked
//! by the backend afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{DialError, Result};
use crate::types::InterfaceHandle;

/// Lowest valid 802.1Q VLAN ID.
pub const VLAN_MIN: u16 = 1;
/// Highest valid 802.1Q VLAN ID (4095 is reserved).
pub const VLAN_MAX: u16 = 4094;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetMode {
    Physical,
    Vlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mode: Option<NetMode>,
    pub base_interface: Option<String>,
    /// Tag spec: `2000`, `2000,2001`, `2000-2005`, or a mix.
    #[serde(default)]
    pub vlan_tags: Option<String>,
}

impl NetworkConfig {
    /// Ordered candidate interfaces.
    ///
    /// Fails with [`DialError::Configuration`] when the configuration is
    /// incomplete. There is deliberately no fallback to auto-detection.
    pub fn candidates(&self) -> Result<Vec<InterfaceHandle>> {
        let mode = self
            .mode
            .ok_or_else(|| DialError::Configuration("mode is not set".into()))?;
        let base = self
            .base_interface
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| DialError::Configuration("base_interface is not set".into()))?;

        match mode {
            NetMode::Physical => Ok(vec![InterfaceHandle::physical(base)]),
            NetMode::Vlan => {
                let spec = self
                    .vlan_tags
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        DialError::Configuration("vlan mode requires vlan_tags".into())
                    })?;
                let tags = parse_vlan_tags(spec)?;
                if tags.is_empty() {
                    return Err(DialError::Configuration(format!(
                        "no VLAN tags in {spec:?}"
                    )));
                }
                Ok(tags
                    .into_iter()
                    .map(|tag| InterfaceHandle::vlan(base, tag))
                    .collect())
            }
        }
    }
}

/// Parse a VLAN tag spec into a sorted, deduplicated tag list.
///
/// Accepts single tags, comma-separated lists, and inclusive ranges
/// (`2000,2002-2005,2007`). Empty list items are ignored.
pub fn parse_vlan_tags(spec: &str) -> Result<Vec<u16>> {
    let mut tags = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_tag(start, part)?;
                let end = parse_tag(end, part)?;
                if start > end {
                    return Err(DialError::Configuration(format!(
                        "VLAN range {part} is inverted"
                    )));
                }
                tags.extend(start..=end);
            }
            None => tags.push(parse_tag(part, part)?),
        }
    }
    tags.sort_unstable();
    tags.dedup();
    Ok(tags)
}

fn parse_tag(raw: &str, part: &str) -> Result<u16> {
    let tag: u16 = raw
        .trim()
        .parse()
        .map_err(|_| DialError::Configuration(format!("invalid VLAN tag in {part:?}")))?;
    if !(VLAN_MIN..=VLAN_MAX).contains(&tag) {
        return Err(DialError::Configuration(format!(
            "VLAN tag {tag} out of range ({VLAN_MIN}-{VLAN_MAX})"
        )));
    }
    Ok(tag)
}
