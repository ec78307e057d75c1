use async_trait::async_trait;

use crate::error::Result;
use crate::mac::MacAddress;
use crate::types::{Credentials, InterfaceHandle, Lease};

/// Platform side of a verification call.
///
/// The orchestrator owns allocation and bookkeeping; a backend only touches
/// the host. Callers must hold the interface's [`InterfaceLock`] around
/// `prepare`, and around `dial` too when the lock spans the session.
///
/// [`InterfaceLock`]: crate::InterfaceLock
#[async_trait]
pub trait DialBackend: Send + Sync {
    /// Human-readable backend name (e.g. "pppd").
    fn name(&self) -> &str;

    /// Check that every candidate exists in the kernel and return the ones
    /// usable right now, in order.
    ///
    /// A missing interface fails the whole call with
    /// [`DialError::InterfaceMissing`]. Interfaces without link may be
    /// filtered out silently.
    ///
    /// [`DialError::InterfaceMissing`]: crate::DialError::InterfaceMissing
    async fn verify_interfaces(
        &self,
        candidates: Vec<InterfaceHandle>,
    ) -> Result<Vec<InterfaceHandle>>;

    /// Clear stale sessions on a claimed interface and give it a fresh
    /// random MAC. Returns the assigned address.
    async fn prepare(&self, interface: &InterfaceHandle) -> Result<MacAddress>;

    /// Run one bounded dial attempt and tear it down.
    ///
    /// Resolves to the observed lease, or [`DialError::Failed`] carrying the
    /// classified cause. Teardown always runs before this returns.
    ///
    /// [`DialError::Failed`]: crate::DialError::Failed
    async fn dial(&self, interface: &InterfaceHandle, credentials: &Credentials) -> Result<Lease>;
}
