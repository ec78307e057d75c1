//! ISP login qualification and per-ISP format checks.

use std::collections::BTreeMap;

use dial::ErrorCode;
use serde::{Deserialize, Serialize};

/// Maps (ISP, raw login) to the login the access concentrator expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsernamePolicy {
    /// Suffix for digit-only logins of an ISP missing from `isp_suffixes`.
    pub default_suffix: String,
    pub isp_suffixes: BTreeMap<String, String>,
    /// ISPs whose logins are used exactly as entered.
    pub passthrough_isps: Vec<String>,
    /// Login prefix marking a password-reset account, mapped to its ISP.
    pub reset_prefixes: BTreeMap<String, String>,
}

impl Default for UsernamePolicy {
    fn default() -> Self {
        let isp_suffixes = ["cmccgx", "96301", "10010"]
            .into_iter()
            .map(|isp| (isp.to_string(), isp.to_string()))
            .collect();
        Self {
            default_suffix: "cdu".to_string(),
            isp_suffixes,
            passthrough_isps: vec!["direct".to_string()],
            reset_prefixes: BTreeMap::from([("scxy".to_string(), "cmccgx".to_string())]),
        }
    }
}

impl UsernamePolicy {
    fn is_passthrough(&self, isp: &str, raw: &str) -> bool {
        raw.contains('@') || self.passthrough_isps.iter().any(|p| p == isp)
    }

    fn suffix_for(&self, isp: &str) -> &str {
        self.isp_suffixes
            .get(isp)
            .map_or(self.default_suffix.as_str(), String::as_str)
    }

    /// Qualified login for `raw` under `isp`. Total: unknown shapes pass
    /// through unchanged.
    pub fn normalize(&self, isp: &str, raw: &str) -> String {
        if self.is_passthrough(isp, raw) {
            return raw.to_string();
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            return format!("{raw}@{}", self.suffix_for(isp));
        }
        if let Some(target) = self
            .reset_prefixes
            .iter()
            .find_map(|(prefix, target)| raw.starts_with(prefix.as_str()).then_some(target))
        {
            return format!("{raw}@{}", self.suffix_for(target));
        }
        raw.to_string()
    }

    /// Check `raw` has the shape `isp` issues. Qualified logins and
    /// pass-through ISPs are not checked.
    pub fn validate_format(&self, isp: &str, raw: &str) -> Result<(), ErrorCode> {
        if self.is_passthrough(isp, raw) {
            return Ok(());
        }
        let (valid, code) = match isp {
            "cmccgx" => (
                is_mobile(self.strip_reset_prefix(isp, raw)),
                ErrorCode::InvalidCmccMobile,
            ),
            "96301" => (is_mobile(raw), ErrorCode::InvalidTelecomMobile),
            "10010" => (is_mobile(raw), ErrorCode::InvalidUnicomMobile),
            "cdu" => (is_student_id(raw), ErrorCode::InvalidStudentId),
            _ => return Ok(()),
        };
        if valid { Ok(()) } else { Err(code) }
    }

    fn strip_reset_prefix<'a>(&self, isp: &str, raw: &'a str) -> &'a str {
        self.reset_prefixes
            .iter()
            .filter(|(_, target)| target.as_str() == isp)
            .find_map(|(prefix, _)| raw.strip_prefix(prefix.as_str()))
            .unwrap_or(raw)
    }
}

/// 11 digits starting with 1.
fn is_mobile(s: &str) -> bool {
    s.len() == 11 && s.starts_with('1') && s.chars().all(|c| c.is_ascii_digit())
}

/// 6 to 12 digits.
fn is_student_id(s: &str) -> bool {
    (6..=12).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UsernamePolicy {
        UsernamePolicy::default()
    }

    #[test]
    fn digits_get_isp_suffix() {
        let p = policy();
        assert_eq!(p.normalize("cdu", "2021001234"), "2021001234@cdu");
        assert_eq!(p.normalize("cmccgx", "13800000000"), "13800000000@cmccgx");
        assert_eq!(p.normalize("96301", "13800000000"), "13800000000@96301");
        assert_eq!(p.normalize("10010", "13800000000"), "13800000000@10010");
    }

    #[test]
    fn unknown_isp_falls_back_to_default_suffix() {
        assert_eq!(policy().normalize("campus2", "123456"), "123456@cdu");
    }

    #[test]
    fn passthrough_isp_is_unchanged() {
        assert_eq!(policy().normalize("direct", "anything@x.net"), "anything@x.net");
        assert_eq!(policy().normalize("direct", "12345678"), "12345678");
    }

    #[test]
    fn explicit_domain_is_unchanged() {
        assert_eq!(policy().normalize("cdu", "2021001234@other"), "2021001234@other");
    }

    #[test]
    fn reset_prefix_gets_its_isp_suffix_regardless_of_declared_isp() {
        assert_eq!(policy().normalize("cmccgx", "scxy13800000000"), "scxy13800000000@cmccgx");
        assert_eq!(policy().normalize("cdu", "scxy13800000000"), "scxy13800000000@cmccgx");
    }

    #[test]
    fn other_shapes_pass_through() {
        assert_eq!(policy().normalize("cdu", "alice"), "alice");
    }

    #[test]
    fn mobile_formats() {
        let p = policy();
        assert_eq!(p.validate_format("cmccgx", "13800000000"), Ok(()));
        assert_eq!(p.validate_format("cmccgx", "scxy13800000000"), Ok(()));
        assert_eq!(
            p.validate_format("cmccgx", "23800000000"),
            Err(ErrorCode::InvalidCmccMobile)
        );
        assert_eq!(
            p.validate_format("96301", "1380000000"),
            Err(ErrorCode::InvalidTelecomMobile)
        );
        assert_eq!(
            p.validate_format("10010", "scxy13800000000"),
            Err(ErrorCode::InvalidUnicomMobile)
        );
    }

    #[test]
    fn student_id_format() {
        let p = policy();
        assert_eq!(p.validate_format("cdu", "202100"), Ok(()));
        assert_eq!(p.validate_format("cdu", "202100123456"), Ok(()));
        assert_eq!(p.validate_format("cdu", "20210"), Err(ErrorCode::InvalidStudentId));
        assert_eq!(
            p.validate_format("cdu", "2021001234567"),
            Err(ErrorCode::InvalidStudentId)
        );
        assert_eq!(p.validate_format("cdu", "abc123"), Err(ErrorCode::InvalidStudentId));
    }

    #[test]
    fn qualified_and_passthrough_logins_skip_format_check() {
        let p = policy();
        assert_eq!(p.validate_format("cdu", "x@cdu"), Ok(()));
        assert_eq!(p.validate_format("direct", "whatever"), Ok(()));
        assert_eq!(p.validate_format("unknown", "whatever"), Ok(()));
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let p: UsernamePolicy = serde_yaml_ng::from_str("default_suffix: campus\n").unwrap();
        assert_eq!(p.default_suffix, "campus");
        assert_eq!(p.normalize("cmccgx", "13800000000"), "13800000000@cmccgx");
        assert_eq!(p.normalize("x", "123456"), "123456@campus");
    }
}
