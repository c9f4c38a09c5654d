use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{
    client::{DssClient, DssOperation},
    model::{
        ComputeConfigurationDataRequest, ComputeConfigurationDataResponse, ConfigurationEntry,
        GetWifiCredentialsRequest, GetWifiCredentialsResponse, PostWifiScanDataRequest,
        PostWifiScanDataResponse, RegistrationState, ReportRequest, ReportResponse, ReportResult,
        RequestHeader, StartPinBasedSetupRequest, StartPinBasedSetupResponse,
        StartProvisioningSessionRequest, StartProvisioningSessionResponse,
    },
};
use crate::{
    config::{HASHED_PIN_MAX, PIN_HASH_SIZE},
    error::{FfsError, FfsResult},
    platform::{ConnectionAttempts, CryptoProvider, DssTransport, ScanResults},
    provisionee::ProvisioneeState,
    stream::StreamBuffer,
};

impl<T, C> DssClient<'_, T, C>
where
    T: DssTransport,
    C: CryptoProvider,
{
    /// Opens a new session. Any previous session is dropped first.
    pub fn start_provisioning_session(&mut self) -> FfsResult<StartProvisioningSessionResponse> {
        self.session.invalidate();
        let len = self.write_request(|header, out| {
            StartProvisioningSessionRequest {
                nonce: header.nonce,
            }
            .serialize(out)
        })?;
        let body = self.execute(DssOperation::StartProvisioningSession, len)?;
        let response = StartProvisioningSessionResponse::deserialize(&self.response[..body])?;
        self.session.check_nonce(&response.nonce)?;
        self.session.session_id = Some(response.session_id.clone());
        log::info!(
            "dss: session started can_proceed={} salt={}",
            response.can_proceed,
            response.salt.is_some()
        );
        Ok(response)
    }

    /// Proves the device PIN, hashed with the salt from the session start.
    pub fn start_pin_based_setup(&mut self, salt: &str) -> FfsResult<StartPinBasedSetupResponse> {
        let mut digest = [0u8; PIN_HASH_SIZE];
        self.crypto.hash_pin(salt.as_bytes(), &mut digest)?;
        let mut encoded = [0u8; HASHED_PIN_MAX];
        let encoded_len = STANDARD.encode_slice(digest, &mut encoded)?;
        let hashed_pin = core::str::from_utf8(&encoded[..encoded_len]).map_err(|_| FfsError::Error)?;

        let len = self.write_request(|header, out| {
            StartPinBasedSetupRequest { header: *header }.start_serializing(out)?;
            StartPinBasedSetupRequest::add_hashed_pin(out, hashed_pin)?;
            StartPinBasedSetupRequest::finish_serializing(out)
        })?;
        let body = self.execute(DssOperation::StartPinBasedSetup, len)?;
        let response = StartPinBasedSetupResponse::deserialize(&self.response[..body])?;
        self.session.check_nonce(&response.nonce)?;
        Ok(response)
    }

    pub fn compute_configuration_data(
        &mut self,
        configuration: &[ConfigurationEntry],
    ) -> FfsResult<ComputeConfigurationDataResponse> {
        let len = self.write_request(|header, out| {
            ComputeConfigurationDataRequest {
                header: *header,
                configuration,
            }
            .serialize(out)
        })?;
        let body = self.execute(DssOperation::ComputeConfigurationData, len)?;
        let response = ComputeConfigurationDataResponse::deserialize(&self.response[..body])?;
        self.session.check_nonce(&response.nonce)?;
        Ok(response)
    }

    /// Posts as many queued scan results as fit in one page.
    ///
    /// Results leave `results` only once the service accepted the page; the
    /// rest stay at the front for `sequence_number + 1`.
    pub fn post_wifi_scan_data(
        &mut self,
        sequence_number: u32,
        results: &mut ScanResults,
    ) -> FfsResult<PostWifiScanDataResponse> {
        let mut queued = 0usize;
        let len = self.write_request(|header, out| {
            PostWifiScanDataRequest {
                header: *header,
                sequence_number,
            }
            .start_serializing(out)?;
            for result in results.iter() {
                match PostWifiScanDataRequest::add_item(out, result) {
                    Ok(()) => queued += 1,
                    Err(FfsError::Overrun) => break,
                    Err(err) => return Err(err),
                }
            }
            if queued == 0 && !results.is_empty() {
                return Err(FfsError::Overrun);
            }
            PostWifiScanDataRequest::finish_serializing(out)
        })?;
        let body = self.execute(DssOperation::PostWifiScanData, len)?;
        let response = PostWifiScanDataResponse::deserialize(&self.response[..body])?;
        self.session.check_nonce(&response.nonce)?;

        for _ in 0..queued {
            results.pop_front()?;
        }
        log::debug!(
            "dss: scan page seq={} posted={} left={} total_found={} all_found={}",
            sequence_number,
            queued,
            results.count(),
            response.total_credentials_found,
            response.all_credentials_found
        );
        Ok(response)
    }

    pub fn get_wifi_credentials(&mut self, sequence_number: u32) -> FfsResult<GetWifiCredentialsResponse> {
        let len = self.write_request(|header, out| {
            GetWifiCredentialsRequest {
                header: *header,
                sequence_number,
            }
            .serialize(out)
        })?;
        let body = self.execute(DssOperation::GetWifiCredentials, len)?;
        let response = GetWifiCredentialsResponse::deserialize(&self.response[..body])?;
        self.session.check_nonce(&response.nonce)?;
        Ok(response)
    }

    /// Reports the outcome of `state`, draining as many connection attempts
    /// as fit.
    pub fn report(
        &mut self,
        state: ProvisioneeState,
        result: ReportResult,
        registration_state: RegistrationState,
        mut attempts: Option<&mut ConnectionAttempts>,
    ) -> FfsResult<ReportResponse> {
        let sequence_number = self.session.next_sequence_number();
        let mut queued = 0usize;
        let len = self.write_request(|header, out| {
            ReportRequest {
                header: *header,
                sequence_number,
                current_state: state,
                registration_state,
                result,
            }
            .start_serializing(out)?;
            if let Some(attempts) = attempts.as_deref() {
                for attempt in attempts.iter() {
                    match ReportRequest::add_connection_attempt(out, attempt) {
                        Ok(()) => queued += 1,
                        Err(FfsError::Overrun) => break,
                        Err(err) => return Err(err),
                    }
                }
                if queued == 0 && !attempts.is_empty() {
                    return Err(FfsError::Overrun);
                }
            }
            ReportRequest::finish_serializing(out)
        })?;
        let body = self.execute(DssOperation::Report, len)?;
        let response = ReportResponse::deserialize(&self.response[..body])?;
        self.session.check_nonce(&response.nonce)?;

        if let Some(attempts) = attempts.as_deref_mut() {
            for _ in 0..queued {
                attempts.pop_front()?;
            }
        }
        log::info!(
            "dss: report seq={} state={} result={} can_proceed={}",
            sequence_number,
            state.as_str(),
            result.as_str(),
            response.can_proceed
        );
        Ok(response)
    }

    /// Refreshes the nonce and encodes one request body into the request
    /// buffer, returning its length.
    fn write_request<F>(&mut self, encode: F) -> FfsResult<usize>
    where
        F: FnOnce(&RequestHeader<'_>, &mut StreamBuffer<'_>) -> FfsResult<()>,
    {
        self.refresh_nonce()?;
        let header = RequestHeader {
            nonce: &self.session.nonce,
            session_id: self.session.session_id.as_deref(),
            device_details: Some(&self.device_details),
        };
        let mut out = StreamBuffer::output(&mut *self.request);
        encode(&header, &mut out)?;
        Ok(out.data_size())
    }
}
