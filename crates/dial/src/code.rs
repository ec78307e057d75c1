use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Operator-facing error taxonomy.
///
/// Protocol failures reuse the Windows RAS / RADIUS disconnect-cause numbers
/// operators already know from home routers; everything this service detects
/// itself gets a symbolic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // -- client errors --
    ParamMissing,
    InvalidCmccMobile,
    InvalidTelecomMobile,
    InvalidUnicomMobile,
    InvalidStudentId,

    // -- resource / configuration --
    NoInterface,
    Configuration,
    InterfaceMissing,
    Lock,

    // -- local actions --
    MacAssignment,
    StartFailed,

    // -- classified from the daemon log --
    AuthRejected,
    AuthFailed,
    RemoteUnresponsive,
    LinkTerminated,
    ProtocolTimeout,
    ConnectionClosed,
    DeviceUnavailable,
    NoIpObtained,
}

impl ErrorCode {
    /// Wire value reported in responses and activation records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParamMissing => "999",
            Self::InvalidCmccMobile => "INVALID_CMCC_MOBILE",
            Self::InvalidTelecomMobile => "INVALID_TELECOM_MOBILE",
            Self::InvalidUnicomMobile => "INVALID_UNICOM_MOBILE",
            Self::InvalidStudentId => "INVALID_STUDENT_ID",
            Self::NoInterface => "998",
            Self::Configuration => "CONFIG_ERROR",
            Self::InterfaceMissing => "IFACE_MISSING",
            Self::Lock => "LOCK_FAIL",
            Self::MacAssignment => "MAC_FAIL",
            Self::StartFailed => "START_FAIL",
            Self::AuthRejected => "691",
            Self::AuthFailed => "AUTH_FAIL",
            Self::RemoteUnresponsive => "678",
            Self::LinkTerminated => "734",
            Self::ProtocolTimeout => "718",
            Self::ConnectionClosed => "629",
            Self::DeviceUnavailable => "630",
            Self::NoIpObtained => "815",
        }
    }

    /// Default operator message when nothing more specific is known.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::ParamMissing => "missing required parameters",
            Self::InvalidCmccMobile => "China Mobile accounts must be an 11-digit mobile number",
            Self::InvalidTelecomMobile => "China Telecom accounts must be an 11-digit mobile number",
            Self::InvalidUnicomMobile => "China Unicom accounts must be an 11-digit mobile number",
            Self::InvalidStudentId => "campus accounts must be a 6 to 12 digit student number",
            Self::NoInterface => "system busy, please try again later",
            Self::Configuration => "network configuration is missing or incomplete",
            Self::InterfaceMissing => "configured network interface does not exist",
            Self::Lock => "failed to lock network interface",
            Self::MacAssignment => "failed to set MAC address",
            Self::StartFailed => "failed to start dial daemon",
            Self::AuthRejected | Self::AuthFailed => {
                "wrong account or password, please check and retry"
            }
            Self::RemoteUnresponsive => {
                "remote computer did not respond; network unreachable or line not connected"
            }
            Self::LinkTerminated => "PPP link control terminated, please retry later",
            Self::ProtocolTimeout => "PPP protocol timed out; network congested or server unresponsive",
            Self::ConnectionClosed => "connection was closed by the remote computer, please retry later",
            Self::DeviceUnavailable => "connection failed, device unavailable; check local NIC or cabling",
            Self::NoIpObtained => "connection failed, no IP address obtained",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Which code family reports an authentication rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthCodeFamily {
    /// RAS disconnect cause `691`.
    #[default]
    Ras,
    /// Symbolic `AUTH_FAIL`.
    Symbolic,
}

impl AuthCodeFamily {
    pub fn code(self) -> ErrorCode {
        match self {
            Self::Ras => ErrorCode::AuthRejected,
            Self::Symbolic => ErrorCode::AuthFailed,
        }
    }
}

/// Outcome of classifying a failed session: a code plus operator message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: ErrorCode,
    pub message: String,
}

impl Classification {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classification carrying the code's default message.
    pub fn of(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }
}
