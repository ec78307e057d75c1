use std::sync::Arc;

use async_trait::async_trait;
use dial::{
    Credentials, DialBackend, DialError, InterfaceHandle, Lease, LogClassifier, MacAddress,
};
use tracing::{info, warn};

use crate::classify::{RuleClassifier, classify_file};
use crate::config::PppdConfig;
use crate::link::IpLink;
use crate::paths::SessionLogs;
use crate::process::kill_matching;
use crate::session::{DialSession, WaitOutcome};

/// Dial backend driving pppd with the rp-pppoe plugin.
pub struct PppdBackend {
    config: PppdConfig,
    link: IpLink,
    logs: SessionLogs,
    classifier: Arc<dyn LogClassifier>,
}

impl PppdBackend {
    pub fn new(config: PppdConfig) -> Self {
        let link = IpLink::new(config.sysfs_net.clone(), config.privilege);
        let logs = SessionLogs::new(config.log_dir.clone());
        let classifier = Arc::new(RuleClassifier::pppd(config.auth_code_family));
        Self {
            config,
            link,
            logs,
            classifier,
        }
    }

    /// Replace the failure classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn LogClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &PppdConfig {
        &self.config
    }

    pub fn link(&self) -> &IpLink {
        &self.link
    }

    pub fn logs(&self) -> &SessionLogs {
        &self.logs
    }

    /// Kill any daemon left running on exactly this interface.
    ///
    /// Returns whether one was found. The pattern ends at the interface name
    /// plus a space, so `eth0.20` never matches a session on `eth0.200`.
    async fn kill_stale_session(&self, interface: &str) -> bool {
        let pattern = stale_session_pattern(&self.config, interface);
        kill_matching(&pattern, self.config.privilege).await
    }
}

/// `pkill -f` pattern for a pppd bound to `interface`.
///
/// Dots are escaped, which also stops the pattern from matching the
/// `sudo pkill` command line carrying it.
fn stale_session_pattern(config: &PppdConfig, interface: &str) -> String {
    let program = config
        .binary
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("pppd");
    format!(
        "{} plugin {} {} ",
        escape_regex(program),
        escape_regex(&config.plugin),
        escape_regex(interface)
    )
}

fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '\\' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl DialBackend for PppdBackend {
    fn name(&self) -> &str {
        "pppd"
    }

    async fn verify_interfaces(
        &self,
        candidates: Vec<InterfaceHandle>,
    ) -> dial::Result<Vec<InterfaceHandle>> {
        let mut usable = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !self.link.exists(&candidate.name).await {
                return Err(DialError::InterfaceMissing(candidate.name));
            }
            if self.config.require_carrier && !self.link.has_carrier(&candidate.name).await {
                info!(iface = %candidate.name, "no carrier, skipping");
                continue;
            }
            usable.push(candidate);
        }
        Ok(usable)
    }

    async fn prepare(&self, interface: &InterfaceHandle) -> dial::Result<MacAddress> {
        if self.kill_stale_session(&interface.name).await {
            warn!(iface = %interface.name, "killed stale dial daemon");
            tokio::time::sleep(self.config.stale_settle).await;
        }
        let mac = MacAddress::random_local();
        self.link.set_mac(&interface.name, mac).await?;
        Ok(mac)
    }

    async fn dial(
        &self,
        interface: &InterfaceHandle,
        credentials: &Credentials,
    ) -> dial::Result<Lease> {
        self.logs.ensure_dir().await.map_err(|e| {
            DialError::Spawn(format!("create log dir {}: {e}", self.logs.dir().display()))
        })?;
        let log_path = self.logs.new_log_path(&interface.name);

        let mut session =
            DialSession::spawn(&self.config, &interface.name, credentials, log_path).await?;
        let outcome = session
            .wait_for_lease(&self.link, self.config.timeout, self.config.poll_interval)
            .await;
        session.teardown(&self.link).await;

        match outcome {
            WaitOutcome::Lease { device, ip } => Ok(Lease {
                ip,
                device,
                log_path: session.log_path().to_path_buf(),
                elapsed: session.elapsed(),
            }),
            WaitOutcome::Exited(_) | WaitOutcome::TimedOut => {
                let classification =
                    classify_file(self.classifier.as_ref(), session.log_path()).await;
                info!(
                    iface = %interface.name,
                    code = %classification.code,
                    outcome = ?outcome,
                    "dial failed"
                );
                Err(DialError::Failed(classification))
            }
        }
    }
}
