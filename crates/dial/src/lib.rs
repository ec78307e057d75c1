mod allocator;
mod backend;
mod classify;
mod code;
mod error;
mod mac;
mod network;
mod types;

pub use allocator::{InterfaceAllocator, InterfaceLock};
pub use backend::DialBackend;
pub use classify::LogClassifier;
pub use code::{AuthCodeFamily, Classification, ErrorCode};
pub use error::{DialError, Result};
pub use mac::MacAddress;
pub use network::{NetMode, NetworkConfig, VLAN_MAX, VLAN_MIN, parse_vlan_tags};
pub use types::{Credentials, InterfaceHandle, InterfaceKind, Lease};
