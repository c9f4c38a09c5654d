use embassy_time::Duration;
use statig::blocking::IntoStateMachineExt as _;

use super::{
    hsm::{DispatchContext, DispatchStatus, ProvisioneeEvent, ProvisioneeHsm},
    state::ProvisioneeState,
};
use crate::{
    config::ProvisioneeConfig,
    dss::model::ReportResponse,
    error::{FfsError, FfsResult},
    iso8601::parse_duration,
};

/// What the driver should do after a report was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Run the step of the state that is now current, after `wait`.
    Advance { wait: Duration },
    /// Run the same step again, after `wait`.
    Retry { wait: Duration },
    /// The service ended the session.
    Stop,
}

/// Provisioning progress, driven by local advances and the service's
/// answers to reports.
///
/// Once a terminal state is reached every further call is rejected and
/// nothing changes.
pub struct ProvisioningMachine {
    machine: statig::blocking::StateMachine<ProvisioneeHsm>,
    config: ProvisioneeConfig,
    transitions: u32,
}

impl ProvisioningMachine {
    pub fn new(config: ProvisioneeConfig) -> Self {
        Self {
            machine: ProvisioneeHsm::new().state_machine(),
            config: config.sanitized(),
            transitions: 0,
        }
    }

    pub fn state(&self) -> ProvisioneeState {
        self.machine.inner().current
    }

    pub const fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Steps that need no answer from the service: NotProvisioned to
    /// ConnectingToSetupNetwork to StartProvisioning.
    pub fn advance_local(&mut self) -> FfsResult<ProvisioneeState> {
        match self.dispatch(ProvisioneeEvent::AdvanceLocal)? {
            DispatchStatus::Advanced => Ok(self.state()),
            _ => Err(FfsError::Error),
        }
    }

    pub fn apply_report(&mut self, response: &ReportResponse) -> FfsResult<Directive> {
        if let Some(reason) = response.reason.as_deref() {
            log::info!(
                "provisionee: report reason state={} reason={}",
                self.state().as_str(),
                reason
            );
        }
        let status = self.dispatch(ProvisioneeEvent::Report {
            can_proceed: response.can_proceed,
            next_state: response.next_state,
        })?;
        match status {
            DispatchStatus::Advanced => Ok(Directive::Advance {
                wait: self.wait_time(response, Duration::from_ticks(0)),
            }),
            DispatchStatus::Repeated => Ok(Directive::Retry {
                wait: self.wait_time(
                    response,
                    Duration::from_millis(self.config.default_retry_wait_ms as u64),
                ),
            }),
            DispatchStatus::Stopped => Ok(Directive::Stop),
            DispatchStatus::Rejected => Err(FfsError::Error),
        }
    }

    pub fn terminate(&mut self) -> FfsResult<()> {
        self.dispatch(ProvisioneeEvent::Terminate).map(|_| ())
    }

    /// Ends in Failure without an answer from the service, for faults that
    /// leave nothing to report over.
    pub fn fail(&mut self) -> FfsResult<()> {
        self.dispatch(ProvisioneeEvent::Fail).map(|_| ())
    }

    fn dispatch(&mut self, event: ProvisioneeEvent) -> FfsResult<DispatchStatus> {
        let before = self.state();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);

        match context.status {
            DispatchStatus::Rejected => {
                log::warn!(
                    "provisionee: event={:?} rejected state={}",
                    event,
                    before.as_str()
                );
                Err(FfsError::Error)
            }
            DispatchStatus::Repeated => {
                log::info!("provisionee: repeat state={}", before.as_str());
                Ok(DispatchStatus::Repeated)
            }
            status => {
                self.transitions = self.transitions.saturating_add(1);
                log::info!(
                    "provisionee: state={} -> {}",
                    before.as_str(),
                    self.state().as_str()
                );
                Ok(status)
            }
        }
    }

    /// Advised back-off, capped. A missing or unreadable `waitTime` falls
    /// back to `fallback`.
    fn wait_time(&self, response: &ReportResponse, fallback: Duration) -> Duration {
        let requested = match response.wait_time.as_deref() {
            None => fallback,
            Some(text) => parse_duration(text).unwrap_or_else(|_| {
                log::warn!("provisionee: ignoring wait_time={}", text);
                fallback
            }),
        };
        requested.min(Duration::from_millis(self.config.max_wait_time_ms as u64))
    }
}
