use crate::error::{FfsError, FfsResult};

/// Where the device is in the setup flow.
///
/// Declaration order is the canonical progression. `ConnectingToSetupNetwork`,
/// `Failure` and `Terminated` exist only on the device and have no wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProvisioneeState {
    NotProvisioned,
    ConnectingToSetupNetwork,
    StartProvisioning,
    StartPinBasedSetup,
    ComputeConfiguration,
    PostWifiScanData,
    GetWifiList,
    ConnectingToUserNetwork,
    ConnectedToUserNetwork,
    Done,
    Failure,
    Terminated,
}

impl ProvisioneeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotProvisioned => "NotProvisioned",
            Self::ConnectingToSetupNetwork => "ConnectingToSetupNetwork",
            Self::StartProvisioning => "StartProvisioning",
            Self::StartPinBasedSetup => "StartPinBasedSetup",
            Self::ComputeConfiguration => "ComputeConfiguration",
            Self::PostWifiScanData => "PostWifiScanData",
            Self::GetWifiList => "GetWifiList",
            Self::ConnectingToUserNetwork => "ConnectingToUserNetwork",
            Self::ConnectedToUserNetwork => "ConnectedToUserNetwork",
            Self::Done => "Done",
            Self::Failure => "Failure",
            Self::Terminated => "Terminated",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failure | Self::Terminated)
    }

    /// States whose outcome is reported to the service.
    pub const fn is_exchange(self) -> bool {
        matches!(
            self,
            Self::StartProvisioning
                | Self::StartPinBasedSetup
                | Self::ComputeConfiguration
                | Self::PostWifiScanData
                | Self::GetWifiList
                | Self::ConnectingToUserNetwork
                | Self::ConnectedToUserNetwork
        )
    }

    pub const fn canonical_next(self) -> Option<Self> {
        match self {
            Self::NotProvisioned => Some(Self::ConnectingToSetupNetwork),
            Self::ConnectingToSetupNetwork => Some(Self::StartProvisioning),
            Self::StartProvisioning => Some(Self::StartPinBasedSetup),
            Self::StartPinBasedSetup => Some(Self::ComputeConfiguration),
            Self::ComputeConfiguration => Some(Self::PostWifiScanData),
            Self::PostWifiScanData => Some(Self::GetWifiList),
            Self::GetWifiList => Some(Self::ConnectingToUserNetwork),
            Self::ConnectingToUserNetwork => Some(Self::ConnectedToUserNetwork),
            Self::ConnectedToUserNetwork => Some(Self::Done),
            Self::Done | Self::Failure | Self::Terminated => None,
        }
    }

    pub fn to_dss(self) -> FfsResult<&'static str> {
        match self {
            Self::NotProvisioned => Ok("NOT_PROVISIONED"),
            Self::StartProvisioning => Ok("START_PROVISIONING"),
            Self::StartPinBasedSetup => Ok("START_PIN_BASED_SETUP"),
            Self::ComputeConfiguration => Ok("COMPUTE_CONFIGURATION"),
            Self::PostWifiScanData => Ok("POST_WIFI_SCAN_DATA"),
            Self::GetWifiList => Ok("GET_WIFI_LIST"),
            Self::ConnectingToUserNetwork => Ok("CONNECTING_TO_USER_NETWORK"),
            Self::ConnectedToUserNetwork => Ok("CONNECTED_TO_USER_NETWORK"),
            Self::Done => Ok("DONE"),
            Self::ConnectingToSetupNetwork | Self::Failure | Self::Terminated => {
                Err(FfsError::Error)
            }
        }
    }

    pub fn from_dss(value: &str) -> FfsResult<Self> {
        match value {
            "NOT_PROVISIONED" => Ok(Self::NotProvisioned),
            "START_PROVISIONING" => Ok(Self::StartProvisioning),
            "START_PIN_BASED_SETUP" => Ok(Self::StartPinBasedSetup),
            "COMPUTE_CONFIGURATION" => Ok(Self::ComputeConfiguration),
            "POST_WIFI_SCAN_DATA" => Ok(Self::PostWifiScanData),
            "GET_WIFI_LIST" => Ok(Self::GetWifiList),
            "CONNECTING_TO_USER_NETWORK" => Ok(Self::ConnectingToUserNetwork),
            "CONNECTED_TO_USER_NETWORK" => Ok(Self::ConnectedToUserNetwork),
            "DONE" => Ok(Self::Done),
            _ => Err(FfsError::Error),
        }
    }
}
