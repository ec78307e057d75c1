//! Ordered signature rules mapping a pppd log to an error classification.
//!
//! Several signatures can appear in one log (an auth rejection is usually
//! followed by "Connection terminated"), so rules run top to bottom and the
//! first match wins.

use std::path::Path;

use dial::{AuthCodeFamily, Classification, ErrorCode, LogClassifier};
use tracing::warn;

type Matcher = Box<dyn Fn(&str) -> Option<Classification> + Send + Sync>;

/// One named signature rule.
pub struct Rule {
    name: &'static str,
    matcher: Matcher,
}

impl Rule {
    pub fn new(
        name: &'static str,
        matcher: impl Fn(&str) -> Option<Classification> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            matcher: Box::new(matcher),
        }
    }

    /// Rule yielding `code`'s default message when `pred` holds.
    fn when(
        name: &'static str,
        code: ErrorCode,
        pred: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |log| pred(log).then(|| Classification::of(code)))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

#[derive(Debug)]
pub struct RuleClassifier {
    rules: Vec<Rule>,
}

impl RuleClassifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Signatures of pppd with the rp-pppoe plugin.
    pub fn pppd(auth: AuthCodeFamily) -> Self {
        Self::new(vec![
            Rule::new("auth-rejected", move |log| classify_auth(log, auth.code())),
            Rule::when("discovery-timeout", ErrorCode::RemoteUnresponsive, |log| {
                log.contains("Timeout waiting for PADO packets")
                    || log.contains("Unable to complete PPPoE Discovery")
            }),
            Rule::when("lcp-terminated", ErrorCode::LinkTerminated, |log| {
                log.contains("LCP terminated by peer")
            }),
            Rule::when("lcp-timeout", ErrorCode::ProtocolTimeout, |log| {
                log.contains("LCP timeout")
                    || (log.contains("LCP EchoReq") && !log.contains("LCP EchoRep"))
            }),
            Rule::when("hangup", ErrorCode::ConnectionClosed, |log| {
                log.contains("Modem hangup") || log.contains("Connection terminated")
            }),
            Rule::when("no-discovery-reply", ErrorCode::DeviceUnavailable, |log| {
                log.contains("Send PPPoE Discovery") && !log.contains("Recv PPPoE Discovery")
            }),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Insert a rule ahead of all others.
    pub fn prepend(&mut self, rule: Rule) {
        self.rules.insert(0, rule);
    }
}

impl LogClassifier for RuleClassifier {
    fn classify(&self, log: &str) -> Classification {
        self.rules
            .iter()
            .find_map(|rule| (rule.matcher)(log))
            .unwrap_or_else(|| Classification::of(ErrorCode::NoIpObtained))
    }
}

/// Classify the log at `path`. Never fails: an unreadable log is classified
/// as empty.
pub async fn classify_file(classifier: &dyn LogClassifier, path: &Path) -> Classification {
    let log = match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "dial log unreadable");
            String::new()
        }
    };
    classifier.classify(&log)
}

const AUTH_MARKERS: [&str; 4] = [
    "PAP authentication failed",
    "PAP AuthNak",
    "CHAP authentication failed",
    "CHAP AuthNak",
];

fn classify_auth(log: &str, code: ErrorCode) -> Option<Classification> {
    if !AUTH_MARKERS.iter().any(|m| log.contains(m)) {
        return None;
    }
    let Some(detail) = rejection_detail(log) else {
        return Some(Classification::of(code));
    };
    let lower = detail.to_lowercase();
    let reason = if lower.contains("concurrency") {
        "account is already online elsewhere, wait a few minutes and retry"
    } else if lower.contains("password") || lower.contains("incorrect") {
        "wrong account or password, please check and retry"
    } else if lower.contains("disabled") || lower.contains("deregistered") {
        "account is disabled or deregistered, contact the ISP"
    } else if lower.contains("expired") {
        "account has expired, contact the ISP"
    } else if lower.contains("locked") {
        "account is locked, contact the ISP"
    } else {
        "wrong account or password, please check and retry"
    };
    Some(Classification::new(code, format!("{reason} (detail: {detail})")))
}

/// The server's rejection text.
///
/// Taken from the first quoted string on an `AuthNak` or `CHAP Failure` line,
/// otherwise from the text following "authentication failed".
fn rejection_detail(log: &str) -> Option<&str> {
    let quoted = log
        .lines()
        .filter(|line| line.contains("AuthNak") || line.contains("CHAP Failure"))
        .find_map(first_quoted);
    quoted.or_else(|| {
        log.lines().find_map(|line| {
            let (_, rest) = line.split_once("authentication failed")?;
            let rest = rest.trim_start_matches([':', ' ', '-']).trim();
            (!rest.is_empty()).then_some(rest)
        })
    })
}

fn first_quoted(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once('"')?;
    let (inner, _) = rest.split_once('"')?;
    (!inner.is_empty()).then_some(inner)
}
