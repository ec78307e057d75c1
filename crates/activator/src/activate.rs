//! Verification call orchestration.
//!
//! validate → normalize → resolve → claim → prepare → dial → record. Every
//! call ends in exactly one [`ActivationRecord`], written in
//! [`Activator::activate`] after the outcome is known.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use dial::{
    Classification, Credentials, DialBackend, DialError, ErrorCode, InterfaceAllocator,
    InterfaceHandle,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::config::{ActivatorConfig, LockPolicy};
use crate::netconf;
use crate::records::{ActivationRecord, RecordSink};
use crate::username::UsernamePolicy;
use crate::validation;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reply to `POST /activate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateResponse {
    pub success: bool,
    pub username: Option<String>,
    pub iface: Option<String>,
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

/// What a call learned so far; becomes the record and the response.
#[derive(Debug, Default)]
struct Attempt {
    name: Option<String>,
    role: Option<String>,
    isp: Option<String>,
    username: Option<String>,
    iface: Option<String>,
    mac: Option<String>,
}

impl Attempt {
    /// Seed from whatever string fields the raw body carries.
    fn from_body(body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            name: text("name"),
            role: text("role"),
            isp: text("isp"),
            username: text("username"),
            ..Self::default()
        }
    }
}

pub struct Activator {
    backend: Arc<dyn DialBackend>,
    allocator: InterfaceAllocator,
    sink: Arc<dyn RecordSink>,
    policy: UsernamePolicy,
    network_config: PathBuf,
    lock_policy: LockPolicy,
    validate_username_format: bool,
}

impl Activator {
    pub fn new(
        backend: Arc<dyn DialBackend>,
        sink: Arc<dyn RecordSink>,
        config: &ActivatorConfig,
    ) -> Self {
        Self {
            backend,
            allocator: InterfaceAllocator::new(config.lock_dir.clone()),
            sink,
            policy: config.username_policy.clone(),
            network_config: config.network_config.clone(),
            lock_policy: config.lock_policy,
            validate_username_format: config.validate_username_format,
        }
    }

    pub fn allocator(&self) -> &InterfaceAllocator {
        &self.allocator
    }

    /// Run one verification call and record its outcome.
    pub async fn activate(&self, body: &Value) -> ActivateResponse {
        let span = info_span!("activate", request = %Uuid::new_v4());
        async {
            let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
            let mut attempt = Attempt::from_body(body);
            let outcome = self.execute(&mut attempt, body).await;
            self.finish(attempt, outcome, timestamp).await
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        attempt: &mut Attempt,
        body: &Value,
    ) -> Result<Ipv4Addr, Classification> {
        let request = validation::validate(body).map_err(|missing| {
            warn!(fields = ?missing, "missing required parameters");
            Classification::new(
                ErrorCode::ParamMissing,
                format!(
                    "{}: {}",
                    ErrorCode::ParamMissing.default_message(),
                    missing.join(", ")
                ),
            )
        })?;
        attempt.name = Some(request.name);
        attempt.role = Some(request.role);
        attempt.isp = Some(request.isp.clone());
        attempt.username = Some(request.username.clone());

        if self.validate_username_format {
            self.policy
                .validate_format(&request.isp, &request.username)
                .map_err(|code| {
                    warn!(isp = %request.isp, code = %code, "username format rejected");
                    Classification::of(code)
                })?;
        }
        let username = self.policy.normalize(&request.isp, &request.username);
        info!(isp = %request.isp, username = %username, "activation requested");
        attempt.username = Some(username.clone());
        let credentials = Credentials {
            username,
            password: request.password,
        };

        let candidates = self.resolve_candidates().await.map_err(failure)?;
        let Some((iface, lock)) = self.allocator.try_acquire(&candidates).map_err(failure)?
        else {
            warn!(candidates = candidates.len(), "no idle interface");
            return Err(Classification::of(ErrorCode::NoInterface));
        };
        attempt.iface = Some(iface.name.clone());

        let mac = match self.backend.prepare(&iface).await {
            Ok(mac) => mac,
            Err(e) => {
                if let DialError::MacAssignment { mac, .. } = &e {
                    attempt.mac = Some(mac.to_string());
                }
                return Err(failure(e));
            }
        };
        attempt.mac = Some(mac.to_string());

        let held = match self.lock_policy {
            LockPolicy::HoldSession => Some(lock),
            LockPolicy::ReleaseEarly => {
                drop(lock);
                None
            }
        };
        let lease = self.backend.dial(&iface, &credentials).await;
        drop(held);

        let lease = lease.map_err(failure)?;
        info!(
            iface = %iface.name,
            device = %lease.device,
            ip = %lease.ip,
            elapsed = ?lease.elapsed,
            "activation verified"
        );
        Ok(lease.ip)
    }

    async fn resolve_candidates(&self) -> dial::Result<Vec<InterfaceHandle>> {
        let network = netconf::load(&self.network_config).await?;
        let candidates = network.candidates()?;
        self.backend.verify_interfaces(candidates).await
    }

    async fn finish(
        &self,
        attempt: Attempt,
        outcome: Result<Ipv4Addr, Classification>,
        timestamp: String,
    ) -> ActivateResponse {
        let (ip, failure) = match outcome {
            Ok(ip) => (Some(ip.to_string()), None),
            Err(c) => (None, Some(c)),
        };
        let record = ActivationRecord {
            name: attempt.name,
            role: attempt.role,
            isp: attempt.isp,
            username: attempt.username.clone(),
            success: failure.is_none(),
            ip: ip.clone(),
            mac: attempt.mac.clone(),
            error_code: failure.as_ref().map(|c| c.code.to_string()),
            error_message: failure.as_ref().map(|c| c.message.clone()),
            timestamp,
            iface: attempt.iface.clone(),
        };
        if let Err(e) = self.sink.append(&record).await {
            warn!(error = %e, "failed to write activation record");
        }
        info!(
            success = record.success,
            code = record.error_code.as_deref().unwrap_or("-"),
            "activation finished"
        );

        ActivateResponse {
            success: failure.is_none(),
            username: attempt.username,
            iface: attempt.iface,
            mac: attempt.mac,
            ip,
            error_code: failure.as_ref().map(|c| c.code),
            error_message: failure.map(|c| c.message),
        }
    }
}

fn failure(e: DialError) -> Classification {
    warn!(error = %e, code = %e.code(), "activation step failed");
    Classification::new(e.code(), e.operator_message())
}
