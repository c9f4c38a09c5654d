use embassy_time::Duration;

use super::{
    machine::{Directive, ProvisioningMachine},
    state::ProvisioneeState,
};
use crate::{
    config::{ProvisioneeConfig, SALT_MAX},
    dss::{
        model::{Configuration, ReportResponse, ReportResult},
        DssClient,
    },
    error::{FfsError, FfsResult},
    platform::{
        ConnectionAttempts, CryptoProvider, Delay, DssTransport, ProvisioneePlatform, ScanResults,
        SetupNetwork, WifiControl,
    },
};

/// Cooperative driver: one [`step`](Self::step) runs the current state's
/// action, reports it and applies the service's answer.
pub struct ProvisioneeTask<'b, P, W, T, C> {
    platform: P,
    wifi: W,
    client: DssClient<'b, T, C>,
    machine: ProvisioningMachine,
    config: ProvisioneeConfig,
    setup_network: Option<SetupNetwork>,
    salt: Option<heapless::String<SALT_MAX>>,
    scan_results: ScanResults,
    connection_attempts: ConnectionAttempts,
}

impl<'b, P, W, T, C> ProvisioneeTask<'b, P, W, T, C>
where
    P: ProvisioneePlatform,
    W: WifiControl,
    T: DssTransport,
    C: CryptoProvider,
{
    pub fn new(platform: P, wifi: W, client: DssClient<'b, T, C>, config: ProvisioneeConfig) -> Self {
        let config = config.sanitized();
        Self {
            platform,
            wifi,
            client,
            machine: ProvisioningMachine::new(config),
            config,
            setup_network: None,
            salt: None,
            scan_results: ScanResults::new(),
            connection_attempts: ConnectionAttempts::new(),
        }
    }

    pub fn state(&self) -> ProvisioneeState {
        self.machine.state()
    }

    pub fn machine(&self) -> &ProvisioningMachine {
        &self.machine
    }

    pub fn client(&self) -> &DssClient<'b, T, C> {
        &self.client
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    /// Ends the session from the device side.
    pub fn terminate(&mut self) -> FfsResult<()> {
        self.machine.terminate()
    }

    /// Steps until a terminal state, a stop from the service, or the platform
    /// declining to go on. Returns the state the task stopped in; a fault
    /// along the way ends the run in Failure.
    pub fn run<D>(&mut self, delay: &mut D) -> FfsResult<ProvisioneeState>
    where
        D: Delay + ?Sized,
    {
        loop {
            let state = self.machine.state();
            if state.is_terminal() {
                break;
            }
            match self.platform.can_proceed() {
                Ok(true) => {}
                Ok(false) => {
                    log::info!("provisionee: stopped by platform state={}", state.as_str());
                    break;
                }
                Err(err) => {
                    log::warn!("provisionee: platform fault state={} err={}", state.as_str(), err);
                    self.machine.fail()?;
                    break;
                }
            }
            match self.step() {
                Ok(Directive::Stop) | Err(_) => break,
                Ok(Directive::Advance { wait } | Directive::Retry { wait }) => {
                    if wait > Duration::from_ticks(0) {
                        log::debug!("provisionee: wait ms={}", wait.as_millis());
                        delay.delay(wait);
                    }
                }
            }
        }
        let state = self.machine.state();
        log::info!("provisionee: finished state={}", state.as_str());
        Ok(state)
    }

    /// Runs the current state once. A fault that cannot be reported (the
    /// report itself failed, or no setup network could be joined) moves the
    /// machine to Failure before the error is returned.
    pub fn step(&mut self) -> FfsResult<Directive> {
        let state = self.machine.state();
        if state.is_terminal() {
            log::warn!("provisionee: step in terminal state={}", state.as_str());
            return Err(FfsError::Error);
        }
        let directive = self.step_in(state);
        if let Err(err) = directive {
            log::warn!("provisionee: fault state={} err={}", state.as_str(), err);
            self.machine.fail()?;
        }
        directive
    }

    fn step_in(&mut self, state: ProvisioneeState) -> FfsResult<Directive> {
        match state {
            ProvisioneeState::NotProvisioned => {
                self.machine.advance_local()?;
                Ok(Directive::Advance {
                    wait: Duration::from_ticks(0),
                })
            }
            ProvisioneeState::ConnectingToSetupNetwork => {
                self.connect_to_setup_network()?;
                self.machine.advance_local()?;
                Ok(Directive::Advance {
                    wait: Duration::from_ticks(0),
                })
            }
            state if state.is_exchange() => self.exchange(state),
            _ => Err(FfsError::Error),
        }
    }

    fn exchange(&mut self, state: ProvisioneeState) -> FfsResult<Directive> {
        let outcome = match state {
            ProvisioneeState::StartProvisioning => self.start_provisioning(),
            ProvisioneeState::StartPinBasedSetup => self.start_pin_based_setup(),
            ProvisioneeState::ComputeConfiguration => self.compute_configuration(),
            ProvisioneeState::PostWifiScanData => self.post_wifi_scan_data(),
            ProvisioneeState::GetWifiList => self.get_wifi_list(),
            ProvisioneeState::ConnectingToUserNetwork => self.connect_to_user_network(),
            _ => Ok(()),
        };
        let result = match outcome {
            Ok(()) => ReportResult::Success,
            Err(err) => {
                log::warn!("provisionee: step failed state={} err={}", state.as_str(), err);
                ReportResult::Failure
            }
        };
        let response = self.report(state, result)?;
        self.machine.apply_report(&response)
    }

    fn report(&mut self, state: ProvisioneeState, result: ReportResult) -> FfsResult<ReportResponse> {
        self.wifi.take_connection_attempts(&mut self.connection_attempts)?;
        let registration_state = self.platform.registration_state()?;
        let attempts = if self.connection_attempts.is_empty() {
            None
        } else {
            Some(&mut self.connection_attempts)
        };
        let response = self.client.report(state, result, registration_state, attempts)?;
        self.persist_moved_host()?;
        Ok(response)
    }

    fn persist_moved_host(&mut self) -> FfsResult<()> {
        if !self.client.take_moved_host() {
            return Ok(());
        }
        match self.platform.save_dss_host(self.client.host()) {
            Ok(()) | Err(FfsError::NotImplemented) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn connect_to_setup_network(&mut self) -> FfsResult<()> {
        match self.wifi.connect_to_setup_network(SetupNetwork::Encoded) {
            Ok(()) => {
                self.client.set_via_setup_proxy(true);
                self.setup_network = Some(SetupNetwork::Encoded);
            }
            Err(err) => {
                log::warn!("provisionee: encoded setup network failed err={}", err);
                self.wifi.connect_to_setup_network(SetupNetwork::Fallback)?;
                self.client.set_via_setup_proxy(false);
                self.setup_network = Some(SetupNetwork::Fallback);
            }
        }
        log::info!("provisionee: setup network={:?}", self.setup_network);
        Ok(())
    }

    fn start_provisioning(&mut self) -> FfsResult<()> {
        let response = self.client.start_provisioning_session()?;
        if !response.can_proceed {
            log::warn!("provisionee: session start rejected can_proceed=false");
            return Err(FfsError::Error);
        }
        self.salt = response.salt;
        Ok(())
    }

    fn start_pin_based_setup(&mut self) -> FfsResult<()> {
        let salt = self.salt.as_deref().ok_or(FfsError::Error)?;
        let response = self.client.start_pin_based_setup(salt)?;
        if !response.can_proceed {
            log::warn!("provisionee: pin rejected can_proceed=false");
            return Err(FfsError::Error);
        }
        Ok(())
    }

    fn compute_configuration(&mut self) -> FfsResult<()> {
        let mut configuration = Configuration::new();
        match self.platform.configuration(&mut configuration) {
            Ok(()) => {}
            Err(FfsError::NotImplemented) => configuration.clear(),
            Err(err) => return Err(err),
        }
        let response = self.client.compute_configuration_data(&configuration)?;
        if let Some(details) = &response.registration_details {
            self.platform.save_registration_details(details)?;
        }
        for entry in &response.configuration {
            match self.platform.save_configuration(entry) {
                Ok(()) => {}
                Err(FfsError::NotImplemented) => {
                    log::debug!("provisionee: configuration key={} not kept", entry.key.as_str());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn post_wifi_scan_data(&mut self) -> FfsResult<()> {
        if self.scan_results.is_empty() {
            self.wifi.scan(&mut self.scan_results)?;
            self.drop_hidden_networks()?;
        }
        let mut total_found = 0u32;
        let mut all_found = false;
        let mut posted = 0u32;
        for sequence_number in 1..=u32::from(self.config.max_scan_pages) {
            if !self
                .platform
                .can_post_wifi_scan_data(sequence_number, total_found, all_found)?
            {
                break;
            }
            match self.client.post_wifi_scan_data(sequence_number, &mut self.scan_results) {
                Ok(response) => {
                    posted += 1;
                    total_found = response.total_credentials_found;
                    all_found = response.all_credentials_found;
                }
                Err(err) => {
                    log::warn!("provisionee: scan page seq={} failed err={}", sequence_number, err);
                    break;
                }
            }
        }
        if posted == 0 {
            return Err(FfsError::Error);
        }
        Ok(())
    }

    /// Results without an SSID cannot be matched to saved credentials.
    fn drop_hidden_networks(&mut self) -> FfsResult<()> {
        for _ in 0..self.scan_results.count() {
            let result = self.scan_results.pop_front()?;
            if !result.ssid.is_empty() {
                self.scan_results.push_back(result)?;
            }
        }
        Ok(())
    }

    fn get_wifi_list(&mut self) -> FfsResult<()> {
        let mut all_returned = false;
        for sequence_number in 1..=u32::from(self.config.max_credential_pages) {
            if !self
                .platform
                .can_get_wifi_credentials(sequence_number, all_returned)?
            {
                break;
            }
            let response = self.client.get_wifi_credentials(sequence_number)?;
            for credentials in &response.credentials {
                self.platform.save_wifi_credentials(credentials)?;
            }
            all_returned = response.all_credentials_returned;
            log::debug!(
                "provisionee: credentials page seq={} count={} all_returned={}",
                sequence_number,
                response.credentials.len(),
                all_returned
            );
        }
        Ok(())
    }

    fn connect_to_user_network(&mut self) -> FfsResult<()> {
        self.wifi.disconnect_from_setup_network()?;
        let via_setup_proxy = self.client.via_setup_proxy();
        self.client.set_via_setup_proxy(false);
        if let Err(err) = self.wifi.connect_to_user_network() {
            log::warn!("provisionee: user network failed err={}", err);
            let network = self.setup_network.unwrap_or(SetupNetwork::Fallback);
            self.wifi.connect_to_setup_network(network)?;
            self.client.set_via_setup_proxy(via_setup_proxy);
            return Err(err);
        }
        Ok(())
    }
}
