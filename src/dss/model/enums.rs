use crate::error::{FfsError, FfsResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
    #[default]
    NotRegistered,
    InProgress,
    Complete,
    Failed,
}

impl RegistrationState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRegistered => "NOT_REGISTERED",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> FfsResult<Self> {
        match value {
            "NOT_REGISTERED" => Ok(Self::NotRegistered),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETE" => Ok(Self::Complete),
            "FAILED" => Ok(Self::Failed),
            _ => Err(FfsError::Error),
        }
    }
}

/// Outcome of the local step being reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportResult {
    Success,
    Failure,
}

impl ReportResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    pub fn parse(value: &str) -> FfsResult<Self> {
        match value {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            _ => Err(FfsError::Error),
        }
    }

    pub const fn from_outcome<T>(outcome: &FfsResult<T>) -> Self {
        if outcome.is_ok() {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityProtocol {
    Open,
    WpaPsk,
    Wep,
    Other,
}

impl SecurityProtocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::WpaPsk => "WPA_PSK",
            Self::Wep => "WEP",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> FfsResult<Self> {
        match value {
            "OPEN" => Ok(Self::Open),
            "WPA_PSK" => Ok(Self::WpaPsk),
            "WEP" => Ok(Self::Wep),
            "OTHER" => Ok(Self::Other),
            _ => Err(FfsError::Error),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Disconnected,
    Unauthenticated,
    Authenticated,
    Associated,
    Failed,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Disconnected => "DISCONNECTED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Authenticated => "AUTHENTICATED",
            Self::Associated => "ASSOCIATED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> FfsResult<Self> {
        match value {
            "IDLE" => Ok(Self::Idle),
            "DISCONNECTED" => Ok(Self::Disconnected),
            "UNAUTHENTICATED" => Ok(Self::Unauthenticated),
            "AUTHENTICATED" => Ok(Self::Authenticated),
            "ASSOCIATED" => Ok(Self::Associated),
            "FAILED" => Ok(Self::Failed),
            _ => Err(FfsError::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_tables_are_exact_match_in_both_directions() {
        for state in [
            RegistrationState::NotRegistered,
            RegistrationState::InProgress,
            RegistrationState::Complete,
            RegistrationState::Failed,
        ] {
            assert_eq!(RegistrationState::parse(state.as_str()), Ok(state));
        }
        for protocol in [
            SecurityProtocol::Open,
            SecurityProtocol::WpaPsk,
            SecurityProtocol::Wep,
            SecurityProtocol::Other,
        ] {
            assert_eq!(SecurityProtocol::parse(protocol.as_str()), Ok(protocol));
        }
        for state in [
            ConnectionState::Idle,
            ConnectionState::Disconnected,
            ConnectionState::Unauthenticated,
            ConnectionState::Authenticated,
            ConnectionState::Associated,
            ConnectionState::Failed,
        ] {
            assert_eq!(ConnectionState::parse(state.as_str()), Ok(state));
        }
        assert_eq!(ReportResult::parse("SUCCESS"), Ok(ReportResult::Success));
        assert_eq!(ReportResult::parse("FAILURE"), Ok(ReportResult::Failure));
    }

    #[test]
    fn unknown_strings_are_errors() {
        assert_eq!(SecurityProtocol::parse("WPA2"), Err(FfsError::Error));
        assert_eq!(SecurityProtocol::parse("open"), Err(FfsError::Error));
        assert_eq!(ConnectionState::parse(""), Err(FfsError::Error));
        assert_eq!(RegistrationState::parse("DONE"), Err(FfsError::Error));
        assert_eq!(ReportResult::parse("OK"), Err(FfsError::Error));
    }

    #[test]
    fn report_result_follows_local_outcome() {
        assert_eq!(ReportResult::from_outcome(&Ok::<(), FfsError>(())), ReportResult::Success);
        assert_eq!(ReportResult::from_outcome::<()>(&Err(FfsError::Timeout)), ReportResult::Failure);
    }
}
