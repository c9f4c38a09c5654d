//! In-process stand-ins for the service and the device collaborators.

use std::{
    collections::VecDeque,
    string::{String, ToString},
    vec::Vec,
};

use super::{
    client::DssClient,
    model::{
        ComputeConfigurationDataResponse, Configuration, ConfigurationEntry, ConfigurationKey,
        CredentialsPage, DeviceDetails, GetWifiCredentialsResponse, Nonce,
        PostWifiScanDataResponse, RegistrationDetails, ReportResponse, SecurityProtocol,
        StartPinBasedSetupResponse, StartProvisioningSessionResponse, WifiCredentials,
    },
};
use crate::{
    config::{ProvisioneeConfig, PIN_HASH_SIZE},
    error::{copy_str, FfsError, FfsResult},
    platform::{CryptoProvider, DeviceIdentity, DssTransport, HttpRequest, HttpResponseHead},
    provisionee::ProvisioneeState,
    stream::StreamBuffer,
};

/// base64 of `valid`, the only signature [`FakeCrypto`] accepts.
pub(crate) const VALID_SIGNATURE: &str = "dmFsaWQ=";

#[derive(Debug, Default)]
pub(crate) struct FakeCrypto {
    counter: u8,
    pub(crate) salts: Vec<Vec<u8>>,
}

impl CryptoProvider for FakeCrypto {
    fn random_bytes(&mut self, out: &mut [u8]) -> FfsResult<()> {
        for byte in out {
            *byte = self.counter;
            self.counter = self.counter.wrapping_add(1);
        }
        Ok(())
    }

    fn hash_pin(&mut self, salt: &[u8], out: &mut [u8; PIN_HASH_SIZE]) -> FfsResult<()> {
        self.salts.push(salt.to_vec());
        for (idx, byte) in out.iter_mut().enumerate() {
            *byte = idx as u8 ^ salt.first().copied().unwrap_or_default();
        }
        Ok(())
    }

    fn verify_signature(&mut self, _body: &[u8], signature: &[u8]) -> FfsResult<bool> {
        Ok(signature == b"valid")
    }
}

pub(crate) struct FakeIdentity;

impl DeviceIdentity for FakeIdentity {
    fn device_details(&self) -> FfsResult<DeviceDetails> {
        Ok(DeviceDetails {
            device_serial: Some(copy_str("SN-0001")?),
            ..DeviceDetails::default()
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) path: String,
    pub(crate) body: serde_json::Value,
}

/// Answers every operation the way a cooperative service would, with knobs
/// to misbehave.
#[derive(Debug)]
pub(crate) struct SimulatedDss {
    pub(crate) requests: Vec<Recorded>,
    /// Heads returned, without a body, before any real answer.
    pub(crate) scripted: VecDeque<HttpResponseHead>,
    pub(crate) signature: Option<&'static str>,
    pub(crate) wrong_nonce: bool,
    pub(crate) salt: Option<&'static str>,
    pub(crate) reject_scan_data: bool,
    /// Report in this state answers `canProceed: false`.
    pub(crate) reject_report_in: Option<ProvisioneeState>,
    /// Report in this state answers once without a next state.
    pub(crate) repeat_once_in: Option<ProvisioneeState>,
    pub(crate) wait_time: Option<&'static str>,
    pub(crate) credential_pages: u32,
}

impl Default for SimulatedDss {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            scripted: VecDeque::new(),
            signature: Some(VALID_SIGNATURE),
            wrong_nonce: false,
            salt: Some("pepper"),
            reject_scan_data: false,
            reject_report_in: None,
            repeat_once_in: None,
            wait_time: None,
            credential_pages: 1,
        }
    }
}

impl SimulatedDss {
    pub(crate) fn paths(&self) -> Vec<&str> {
        self.requests.iter().map(|request| request.path.as_str()).collect()
    }

    /// `currentProvisioningState` of every report, in order.
    pub(crate) fn reported_states(&self) -> Vec<String> {
        self.requests
            .iter()
            .filter(|request| request.path == "/api/v1/report")
            .filter_map(|request| request.body["currentProvisioningState"].as_str())
            .map(ToString::to_string)
            .collect()
    }

    fn answer(
        &mut self,
        path: &str,
        request: &serde_json::Value,
        nonce: Nonce,
        out: &mut StreamBuffer<'_>,
    ) -> FfsResult<()> {
        match path {
            "/api/v1/startProvisioningSession" => StartProvisioningSessionResponse {
                nonce,
                session_id: copy_str("session-1")?,
                can_proceed: true,
                salt: self.salt.map(copy_str).transpose()?,
            }
            .serialize(out),
            "/api/v1/startPinBasedSetup" => StartPinBasedSetupResponse {
                nonce,
                can_proceed: true,
            }
            .serialize(out),
            "/api/v1/computeConfigurationData" => {
                let mut configuration = Configuration::new();
                configuration
                    .push(ConfigurationEntry {
                        key: ConfigurationKey::CountryCode,
                        value: copy_str("US")?,
                    })
                    .map_err(|_| FfsError::Overrun)?;
                ComputeConfigurationDataResponse {
                    nonce,
                    configuration,
                    registration_details: Some(RegistrationDetails {
                        registration_token: Some(copy_str("token-1")?),
                        expires_at: Some(1_700_000_000),
                    }),
                }
                .serialize(out)
            }
            "/api/v1/postWifiScanData" => {
                if self.reject_scan_data {
                    return out.write_str(r#"{"canProceed":false}"#);
                }
                let listed = request["wifiScanDataList"].as_array().map_or(0, Vec::len);
                PostWifiScanDataResponse {
                    nonce,
                    session_id: copy_str("session-1")?,
                    sequence_number: sequence_number(request),
                    total_credentials_found: listed as u32,
                    all_credentials_found: true,
                }
                .serialize(out)
            }
            "/api/v1/getWifiCredentials" => {
                let sequence_number = sequence_number(request);
                let mut credentials = CredentialsPage::new();
                credentials
                    .push(WifiCredentials {
                        ssid: heapless::Vec::from_slice(b"Home").map_err(|_| FfsError::Overrun)?,
                        security_protocol: SecurityProtocol::WpaPsk,
                        key: heapless::Vec::from_slice(b"password1").map_err(|_| FfsError::Overrun)?,
                        key_index: None,
                        priority: Some(sequence_number as i32),
                        frequency: None,
                    })
                    .map_err(|_| FfsError::Overrun)?;
                GetWifiCredentialsResponse {
                    nonce,
                    session_id: Some(copy_str("session-1")?),
                    sequence_number,
                    all_credentials_returned: sequence_number >= self.credential_pages,
                    credentials,
                }
                .serialize(out)
            }
            "/api/v1/report" => {
                let current = request["currentProvisioningState"]
                    .as_str()
                    .ok_or(FfsError::Error)
                    .and_then(ProvisioneeState::from_dss)?;
                let mut response = ReportResponse {
                    nonce,
                    can_proceed: true,
                    next_state: current.canonical_next(),
                    wait_time: self.wait_time.map(copy_str).transpose()?,
                    reason: None,
                };
                if self.reject_report_in == Some(current) {
                    response.can_proceed = false;
                    response.next_state = None;
                    response.reason = Some(copy_str("rejected")?);
                }
                if self.repeat_once_in == Some(current) {
                    self.repeat_once_in = None;
                    response.next_state = None;
                }
                response.serialize(out)
            }
            _ => Err(FfsError::Error),
        }
    }
}

fn sequence_number(request: &serde_json::Value) -> u32 {
    request["sequenceNumber"].as_u64().unwrap_or_default() as u32
}

impl DssTransport for SimulatedDss {
    fn send(
        &mut self,
        request: &HttpRequest<'_>,
        response: &mut StreamBuffer<'_>,
    ) -> FfsResult<HttpResponseHead> {
        let body: serde_json::Value =
            serde_json::from_slice(request.body).map_err(|_| FfsError::Error)?;
        self.requests.push(Recorded {
            host: request.host.to_string(),
            port: request.port,
            path: request.path.to_string(),
            body: body.clone(),
        });
        if let Some(head) = self.scripted.pop_front() {
            return Ok(head);
        }

        let nonce = if self.wrong_nonce {
            "stale"
        } else {
            body["nonce"].as_str().unwrap_or_default()
        };
        let nonce = copy_str(nonce)?;
        self.answer(request.path, &body, nonce, response)?;
        Ok(HttpResponseHead {
            status: 200,
            location: None,
            signature: self.signature.map(copy_str).transpose()?,
        })
    }
}

pub(crate) fn client_with<'b>(
    service: SimulatedDss,
    request: &'b mut [u8],
    response: &'b mut [u8],
) -> DssClient<'b, SimulatedDss, FakeCrypto> {
    DssClient::new(
        service,
        FakeCrypto::default(),
        &FakeIdentity,
        ProvisioneeConfig::defaults(),
        request,
        response,
    )
    .unwrap()
}
