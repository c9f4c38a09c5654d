//! Seams between the provisioning engine and the device it runs on.
//!
//! The engine owns no sockets, radios or keys. Each trait here is the one
//! operation family it needs from the outside; firmware implements them over
//! its HTTPS stack, Wi-Fi driver, secure element and flash.

use embassy_time::Duration;

use crate::{
    batch_list::BatchList,
    config::{BATCH_LIST_CAPACITY, LOCATION_MAX, PIN_HASH_SIZE, SIGNATURE_HEADER_MAX},
    dss::model::{
        Configuration, ConfigurationEntry, DeviceDetails, RegistrationDetails, RegistrationState,
        WifiConnectionDetails, WifiCredentials, WifiScanResult,
    },
    error::{FfsError, FfsResult},
    stream::StreamBuffer,
};

pub type ScanResults = BatchList<WifiScanResult, BATCH_LIST_CAPACITY>;
pub type ConnectionAttempts = BatchList<WifiConnectionDetails, BATCH_LIST_CAPACITY>;

/// One JSON `POST` to `https://{host}:{port}{path}`.
#[derive(Clone, Copy, Debug)]
pub struct HttpRequest<'r> {
    pub host: &'r str,
    pub port: u16,
    pub path: &'r str,
    pub body: &'r [u8],
}

impl HttpRequest<'_> {
    pub const METHOD: &'static str = "POST";
    pub const CONTENT_TYPE: &'static str = "application/json";
}

/// Status line and the headers the client looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponseHead {
    pub status: u16,
    /// `Location`, only meaningful on a redirect.
    pub location: Option<heapless::String<LOCATION_MAX>>,
    /// `x-amzn-dss-signature`, base64.
    pub signature: Option<heapless::String<SIGNATURE_HEADER_MAX>>,
}

pub trait DssTransport {
    /// Sends `request` over TLS and writes the response body into `response`.
    ///
    /// A body larger than `response` is [`FfsError::Overrun`]; a peer that
    /// stops answering is [`FfsError::Timeout`].
    fn send(
        &mut self,
        request: &HttpRequest<'_>,
        response: &mut StreamBuffer<'_>,
    ) -> FfsResult<HttpResponseHead>;
}

pub trait DeviceIdentity {
    fn device_details(&self) -> FfsResult<DeviceDetails>;
}

/// Which setup network to join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupNetwork {
    /// Per-device network whose credentials are derived from the device
    /// identity; traffic to the service goes through its proxy port.
    Encoded,
    /// Open, hidden `simple_setup` network, or whatever the device defines
    /// in its place.
    Fallback,
}

pub trait WifiControl {
    fn connect_to_setup_network(&mut self, network: SetupNetwork) -> FfsResult<()>;

    fn disconnect_from_setup_network(&mut self) -> FfsResult<()>;

    /// Tries the saved user networks in priority order.
    fn connect_to_user_network(&mut self) -> FfsResult<()>;

    /// Queues visible networks. Stops quietly when `results` is full.
    fn scan(&mut self, results: &mut ScanResults) -> FfsResult<()>;

    /// Moves connection attempts made since the last call into `attempts`.
    fn take_connection_attempts(&mut self, attempts: &mut ConnectionAttempts) -> FfsResult<()>;
}

pub trait CryptoProvider {
    fn random_bytes(&mut self, out: &mut [u8]) -> FfsResult<()>;

    /// SHA-256 of the device PIN followed by `salt`.
    fn hash_pin(&mut self, salt: &[u8], out: &mut [u8; PIN_HASH_SIZE]) -> FfsResult<()>;

    /// Checks the service's signature over a response body.
    fn verify_signature(&mut self, body: &[u8], signature: &[u8]) -> FfsResult<bool>;
}

/// Decisions and storage the application keeps for itself.
pub trait ProvisioneePlatform {
    /// Polled before every step; `false` ends the task.
    fn can_proceed(&mut self) -> FfsResult<bool>;

    fn can_post_wifi_scan_data(
        &mut self,
        sequence_number: u32,
        total_credentials_found: u32,
        all_credentials_found: bool,
    ) -> FfsResult<bool>;

    fn can_get_wifi_credentials(
        &mut self,
        sequence_number: u32,
        all_credentials_returned: bool,
    ) -> FfsResult<bool>;

    fn registration_state(&mut self) -> FfsResult<RegistrationState>;

    fn save_wifi_credentials(&mut self, credentials: &WifiCredentials) -> FfsResult<()>;

    fn save_registration_details(&mut self, details: &RegistrationDetails) -> FfsResult<()>;

    /// [`FfsError::NotImplemented`] means the entry is not kept.
    fn save_configuration(&mut self, entry: &ConfigurationEntry) -> FfsResult<()> {
        let _ = entry;
        Err(FfsError::NotImplemented)
    }

    /// The device's current locale, sent along with the configuration request.
    fn configuration(&mut self, configuration: &mut Configuration) -> FfsResult<()> {
        let _ = configuration;
        Ok(())
    }

    /// Persists a host the service moved to permanently.
    fn save_dss_host(&mut self, host: &str) -> FfsResult<()> {
        let _ = host;
        Err(FfsError::NotImplemented)
    }
}

/// Blocking wait used between steps when the service asks for a back-off.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}
