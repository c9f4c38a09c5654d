use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    config::{
        ProvisioneeConfig, DSS_HOST_DEFAULT, DSS_HOST_MAX, DSS_PORT_DEFAULT, DSS_SETUP_PROXY_PORT,
        NONCE_LEN, SIGNATURE_MAX,
    },
    dss::model::{DeviceDetails, Nonce, SessionId},
    error::{copy_str, FfsError, FfsResult},
    platform::{CryptoProvider, DeviceIdentity, DssTransport, HttpRequest, HttpResponseHead},
    stream::StreamBuffer,
};

pub const SIGNATURE_HEADER: &str = "x-amzn-dss-signature";

const HTTPS_PREFIX: &str = "https://";
const HTTP_OK: u16 = 200;
const HTTP_TEMPORARY_REDIRECT: u16 = 307;
const HTTP_PERMANENT_REDIRECT: u16 = 308;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DssOperation {
    StartProvisioningSession,
    StartPinBasedSetup,
    ComputeConfigurationData,
    PostWifiScanData,
    GetWifiCredentials,
    Report,
}

impl DssOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartProvisioningSession => "startProvisioningSession",
            Self::StartPinBasedSetup => "startPinBasedSetup",
            Self::ComputeConfigurationData => "computeConfigurationData",
            Self::PostWifiScanData => "postWifiScanData",
            Self::GetWifiCredentials => "getWifiCredentials",
            Self::Report => "report",
        }
    }

    pub const fn path(self) -> &'static str {
        match self {
            Self::StartProvisioningSession => "/api/v1/startProvisioningSession",
            Self::StartPinBasedSetup => "/api/v1/startPinBasedSetup",
            Self::ComputeConfigurationData => "/api/v1/computeConfigurationData",
            Self::PostWifiScanData => "/api/v1/postWifiScanData",
            Self::GetWifiCredentials => "/api/v1/getWifiCredentials",
            Self::Report => "/api/v1/report",
        }
    }
}

/// Per-session protocol state.
///
/// The nonce is replaced before every request and every response has to echo
/// it back. A response that does not ends the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DssSession {
    pub(crate) nonce: Nonce,
    pub(crate) session_id: Option<SessionId>,
    pub(crate) sequence_number: u32,
}

impl DssSession {
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Sequence number of the last report sent.
    pub const fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub(crate) fn next_sequence_number(&mut self) -> u32 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sequence_number
    }

    pub(crate) fn check_nonce(&mut self, received: &str) -> FfsResult<()> {
        if received != self.nonce.as_str() {
            log::warn!("dss: nonce mismatch, session dropped");
            self.invalidate();
            return Err(FfsError::Error);
        }
        Ok(())
    }

    pub(crate) fn invalidate(&mut self) {
        self.session_id = None;
        self.sequence_number = 0;
    }
}

/// Sends DSS operations over a [`DssTransport`].
///
/// Requests are encoded into `request`; response bodies land in `response`
/// and stay there until the next call.
pub struct DssClient<'b, T, C> {
    pub(crate) transport: T,
    pub(crate) crypto: C,
    pub(crate) config: ProvisioneeConfig,
    host: heapless::String<DSS_HOST_MAX>,
    port: u16,
    via_setup_proxy: bool,
    moved_host: bool,
    pub(crate) device_details: DeviceDetails,
    pub(crate) session: DssSession,
    pub(crate) request: &'b mut [u8],
    pub(crate) response: &'b mut [u8],
}

impl<'b, T, C> DssClient<'b, T, C>
where
    T: DssTransport,
    C: CryptoProvider,
{
    pub fn new<I>(
        transport: T,
        crypto: C,
        identity: &I,
        config: ProvisioneeConfig,
        request: &'b mut [u8],
        response: &'b mut [u8],
    ) -> FfsResult<Self>
    where
        I: DeviceIdentity + ?Sized,
    {
        let config = config.sanitized();
        Ok(Self {
            transport,
            crypto,
            config,
            host: copy_str(DSS_HOST_DEFAULT)?,
            port: config.dss_port,
            via_setup_proxy: false,
            moved_host: false,
            device_details: identity.device_details()?,
            session: DssSession::default(),
            request,
            response,
        })
    }

    /// Starts from a host saved after an earlier permanent redirect.
    pub fn with_host(mut self, host: &str) -> FfsResult<Self> {
        if host.is_empty() {
            return Err(FfsError::Error);
        }
        self.host = copy_str(host)?;
        Ok(self)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        if self.via_setup_proxy {
            DSS_SETUP_PROXY_PORT
        } else {
            self.port
        }
    }

    pub const fn via_setup_proxy(&self) -> bool {
        self.via_setup_proxy
    }

    /// Traffic goes through the encoded setup network's proxy while set.
    pub fn set_via_setup_proxy(&mut self, enabled: bool) {
        self.via_setup_proxy = enabled;
    }

    pub fn session(&self) -> &DssSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// True once after the service moved permanently to a new host.
    pub fn take_moved_host(&mut self) -> bool {
        core::mem::take(&mut self.moved_host)
    }

    pub(crate) fn refresh_nonce(&mut self) -> FfsResult<()> {
        let mut random = [0u8; NONCE_LEN / 4 * 3];
        self.crypto.random_bytes(&mut random)?;
        let mut encoded = [0u8; NONCE_LEN];
        let len = STANDARD.encode_slice(random, &mut encoded)?;
        let nonce = core::str::from_utf8(&encoded[..len]).map_err(|_| FfsError::Error)?;
        self.session.nonce = copy_str(nonce)?;
        Ok(())
    }

    /// Sends the first `body_len` bytes of the request buffer and returns the
    /// length of the verified response body.
    pub(crate) fn execute(&mut self, operation: DssOperation, body_len: usize) -> FfsResult<usize> {
        let mut redirects = 0u8;
        loop {
            let request = HttpRequest {
                host: &self.host,
                port: self.port(),
                path: operation.path(),
                body: &self.request[..body_len],
            };
            let mut body = StreamBuffer::output(&mut *self.response);
            let head = self.transport.send(&request, &mut body)?;
            body.compact();
            let len = body.data_size();
            log::debug!(
                "dss: op={} status={} len={}",
                operation.as_str(),
                head.status,
                len
            );

            match head.status {
                HTTP_OK => {
                    self.verify_signature(&head, len)?;
                    return Ok(len);
                }
                HTTP_TEMPORARY_REDIRECT | HTTP_PERMANENT_REDIRECT => {
                    if redirects >= self.config.max_redirects {
                        log::warn!(
                            "dss: op={} too many redirects max={}",
                            operation.as_str(),
                            self.config.max_redirects
                        );
                        return Err(FfsError::Error);
                    }
                    redirects += 1;
                    let location = head.location.as_deref().ok_or(FfsError::Error)?;
                    let (host, port) = parse_location(location)?;
                    self.host = copy_str(host)?;
                    self.port = port;
                    if head.status == HTTP_PERMANENT_REDIRECT {
                        self.moved_host = true;
                    }
                    log::info!(
                        "dss: op={} redirected status={} host={} port={}",
                        operation.as_str(),
                        head.status,
                        self.host,
                        self.port
                    );
                }
                status => {
                    log::warn!("dss: op={} unexpected status={}", operation.as_str(), status);
                    return Err(FfsError::Error);
                }
            }
        }
    }

    fn verify_signature(&mut self, head: &HttpResponseHead, len: usize) -> FfsResult<()> {
        if !self.config.verify_signatures {
            return Ok(());
        }
        let Some(encoded) = head.signature.as_deref() else {
            log::warn!("dss: response has no {}", SIGNATURE_HEADER);
            return Err(FfsError::Error);
        };
        let mut signature = [0u8; SIGNATURE_MAX];
        let signature_len = STANDARD
            .decode_slice(encoded.as_bytes(), &mut signature)
            .map_err(|_| FfsError::Error)?;
        if !self
            .crypto
            .verify_signature(&self.response[..len], &signature[..signature_len])?
        {
            log::warn!("dss: response signature rejected");
            return Err(FfsError::Error);
        }
        Ok(())
    }
}

/// Host and port of `https://host[:port][/...]`.
fn parse_location(location: &str) -> FfsResult<(&str, u16)> {
    let rest = location.strip_prefix(HTTPS_PREFIX).ok_or(FfsError::Error)?;
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| FfsError::Error)?),
        None => (authority, DSS_PORT_DEFAULT),
    };
    if host.is_empty() || port == 0 {
        return Err(FfsError::Error);
    }
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dss::testing::{client_with, FakeCrypto, FakeIdentity, Recorded, SimulatedDss};
    use std::collections::VecDeque;

    fn redirect(status: u16, location: &str) -> HttpResponseHead {
        HttpResponseHead {
            status,
            location: Some(copy_str(location).unwrap()),
            signature: None,
        }
    }

    #[test]
    fn every_operation_lives_under_the_versioned_api() {
        for operation in [
            DssOperation::StartProvisioningSession,
            DssOperation::StartPinBasedSetup,
            DssOperation::ComputeConfigurationData,
            DssOperation::PostWifiScanData,
            DssOperation::GetWifiCredentials,
            DssOperation::Report,
        ] {
            assert_eq!(operation.path().strip_prefix("/api/v1/"), Some(operation.as_str()));
        }
    }

    #[test]
    fn location_parsing() {
        assert_eq!(parse_location("https://dss.example.com/api/v1/report"), Ok(("dss.example.com", 443)));
        assert_eq!(parse_location("https://dss.example.com:8443"), Ok(("dss.example.com", 8443)));
        assert_eq!(parse_location("http://dss.example.com/"), Err(FfsError::Error));
        assert_eq!(parse_location("https:///path"), Err(FfsError::Error));
        assert_eq!(parse_location("https://host:port/"), Err(FfsError::Error));
        assert_eq!(parse_location("https://host:0/"), Err(FfsError::Error));
    }

    #[test]
    fn nonce_is_fresh_base64_per_request() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let mut client = client_with(SimulatedDss::default(), &mut request, &mut response);
        client.refresh_nonce().unwrap();
        let first = client.session().nonce.clone();
        client.refresh_nonce().unwrap();
        assert_eq!(first.len(), NONCE_LEN);
        assert_ne!(first, client.session().nonce);
        let mut decoded = [0u8; NONCE_LEN];
        assert_eq!(STANDARD.decode_slice(first.as_bytes(), &mut decoded), Ok(NONCE_LEN / 4 * 3));
    }

    #[test]
    fn start_session_sends_nonce_and_keeps_session_id() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let mut client = client_with(SimulatedDss::default(), &mut request, &mut response);
        let reply = client.start_provisioning_session().unwrap();

        assert!(reply.can_proceed);
        assert_eq!(client.session().session_id(), Some("session-1"));
        let Recorded { host, port, path, body } = &client.transport().requests[0];
        assert_eq!(host, DSS_HOST_DEFAULT);
        assert_eq!(*port, DSS_PORT_DEFAULT);
        assert_eq!(path, "/api/v1/startProvisioningSession");
        assert_eq!(body["nonce"], client.session().nonce());
    }

    #[test]
    fn temporary_redirect_moves_host_for_this_session_only() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let service = SimulatedDss {
            scripted: VecDeque::from([redirect(307, "https://eu.example.com:9443/api")]),
            ..SimulatedDss::default()
        };
        let mut client = client_with(service, &mut request, &mut response);
        client.start_provisioning_session().unwrap();

        assert_eq!(client.host(), "eu.example.com");
        assert_eq!(client.port(), 9443);
        assert!(!client.take_moved_host());
        let requests = &client.transport().requests;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].host, "eu.example.com");
        assert_eq!(requests[1].port, 9443);
    }

    #[test]
    fn permanent_redirect_is_flagged_once() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let service = SimulatedDss {
            scripted: VecDeque::from([redirect(308, "https://moved.example.com/")]),
            ..SimulatedDss::default()
        };
        let mut client = client_with(service, &mut request, &mut response);
        client.start_provisioning_session().unwrap();

        assert_eq!(client.host(), "moved.example.com");
        assert!(client.take_moved_host());
        assert!(!client.take_moved_host());
    }

    #[test]
    fn redirect_loop_gives_up_after_max_redirects() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let hop = redirect(307, "https://loop.example.com/");
        let service = SimulatedDss {
            scripted: VecDeque::from([hop.clone(), hop.clone(), hop.clone(), hop]),
            ..SimulatedDss::default()
        };
        let mut client = client_with(service, &mut request, &mut response);
        assert_eq!(client.start_provisioning_session(), Err(FfsError::Error));
        assert_eq!(client.transport().requests.len(), 4);
    }

    #[test]
    fn redirect_without_usable_location_fails() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let service = SimulatedDss {
            scripted: VecDeque::from([HttpResponseHead {
                status: 307,
                ..HttpResponseHead::default()
            }]),
            ..SimulatedDss::default()
        };
        let mut client = client_with(service, &mut request, &mut response);
        assert_eq!(client.start_provisioning_session(), Err(FfsError::Error));
    }

    #[test]
    fn other_statuses_fail() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let service = SimulatedDss {
            scripted: VecDeque::from([HttpResponseHead {
                status: 500,
                ..HttpResponseHead::default()
            }]),
            ..SimulatedDss::default()
        };
        let mut client = client_with(service, &mut request, &mut response);
        assert_eq!(client.start_provisioning_session(), Err(FfsError::Error));
    }

    #[test]
    fn missing_or_bad_signature_is_rejected() {
        for signature in [None, Some("aW52YWxpZA=="), Some("not base64!")] {
            let mut request = [0u8; 512];
            let mut response = [0u8; 512];
            let service = SimulatedDss {
                signature,
                ..SimulatedDss::default()
            };
            let mut client = client_with(service, &mut request, &mut response);
            assert_eq!(client.start_provisioning_session(), Err(FfsError::Error), "{signature:?}");
        }
    }

    #[test]
    fn unsigned_response_is_accepted_when_verification_is_off() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let service = SimulatedDss {
            signature: None,
            ..SimulatedDss::default()
        };
        let config = ProvisioneeConfig {
            verify_signatures: false,
            ..ProvisioneeConfig::defaults()
        };
        let mut client = DssClient::new(
            service,
            FakeCrypto::default(),
            &FakeIdentity,
            config,
            &mut request,
            &mut response,
        )
        .unwrap();
        assert!(client.start_provisioning_session().is_ok());
    }

    #[test]
    fn setup_proxy_overrides_the_port() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let mut client = client_with(SimulatedDss::default(), &mut request, &mut response);
        client.set_via_setup_proxy(true);
        client.start_provisioning_session().unwrap();
        client.set_via_setup_proxy(false);
        assert_eq!(client.transport().requests[0].port, DSS_SETUP_PROXY_PORT);
        assert_eq!(client.port(), DSS_PORT_DEFAULT);
    }

    #[test]
    fn echoed_nonce_must_match() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let service = SimulatedDss {
            wrong_nonce: true,
            ..SimulatedDss::default()
        };
        let mut client = client_with(service, &mut request, &mut response);
        assert_eq!(client.start_provisioning_session(), Err(FfsError::Error));
        assert_eq!(client.session().session_id(), None);
    }

    #[test]
    fn saved_host_is_used_from_the_first_request() {
        let mut request = [0u8; 512];
        let mut response = [0u8; 512];
        let client = client_with(SimulatedDss::default(), &mut request, &mut response);
        let mut client = client.with_host("saved.example.com").unwrap();
        client.start_provisioning_session().unwrap();
        assert_eq!(client.transport().requests[0].host, "saved.example.com");
    }
}
