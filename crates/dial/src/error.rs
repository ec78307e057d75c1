use crate::code::{Classification, ErrorCode};
use crate::mac::MacAddress;

#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("network configuration error: {0}")]
    Configuration(String),

    #[error("network interface not found: {0}")]
    InterfaceMissing(String),

    #[error("interface lock failed: {0}")]
    Lock(String),

    /// `mac` is the address that was attempted.
    #[error("set MAC {mac} on {interface} failed: {detail}")]
    MacAssignment {
        interface: String,
        mac: MacAddress,
        detail: String,
    },

    #[error("dial daemon start failed: {0}")]
    Spawn(String),

    #[error("dial failed ({}): {}", .0.code, .0.message)]
    Failed(Classification),
}

impl DialError {
    /// Taxonomy code reported to the caller for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::InterfaceMissing(_) => ErrorCode::InterfaceMissing,
            Self::Lock(_) => ErrorCode::Lock,
            Self::MacAssignment { .. } => ErrorCode::MacAssignment,
            Self::Spawn(_) => ErrorCode::StartFailed,
            Self::Failed(c) => c.code,
        }
    }

    /// Message suitable for the operator. Internal detail stays in the log.
    pub fn operator_message(&self) -> String {
        match self {
            Self::Failed(c) => c.message.clone(),
            Self::Configuration(detail) => {
                format!("{}: {detail}", ErrorCode::Configuration.default_message())
            }
            Self::InterfaceMissing(name) => {
                format!("{}: {name}", ErrorCode::InterfaceMissing.default_message())
            }
            Self::Spawn(detail) => format!("{}: {detail}", ErrorCode::StartFailed.default_message()),
            other => other.code().default_message().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DialError>;
