use statig::prelude::*;

use super::state::ProvisioneeState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ProvisioneeEvent {
    AdvanceLocal,
    Report {
        can_proceed: bool,
        next_state: Option<ProvisioneeState>,
    },
    Terminate,
    Fail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum DispatchStatus {
    Advanced,
    Repeated,
    Stopped,
    Rejected,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) status: DispatchStatus,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: DispatchStatus::Rejected,
        }
    }
}

/// `current` mirrors the active leaf; exchange states share one leaf and
/// are told apart by it.
#[derive(Clone, Copy, Debug)]
pub(super) struct ProvisioneeHsm {
    pub(super) current: ProvisioneeState,
}

impl ProvisioneeHsm {
    pub(super) fn new() -> Self {
        Self {
            current: ProvisioneeState::NotProvisioned,
        }
    }

    fn enter(&mut self, context: &mut DispatchContext, next: ProvisioneeState) {
        self.current = next;
        context.status = DispatchStatus::Advanced;
    }
}

#[state_machine(initial = "State::not_provisioned()")]
impl ProvisioneeHsm {
    #[state(superstate = "running")]
    fn not_provisioned(
        &mut self,
        context: &mut DispatchContext,
        event: &ProvisioneeEvent,
    ) -> Outcome<State> {
        match event {
            ProvisioneeEvent::AdvanceLocal => {
                self.enter(context, ProvisioneeState::ConnectingToSetupNetwork);
                Transition(State::connecting_to_setup_network())
            }
            _ => Super,
        }
    }

    #[state(superstate = "running")]
    fn connecting_to_setup_network(
        &mut self,
        context: &mut DispatchContext,
        event: &ProvisioneeEvent,
    ) -> Outcome<State> {
        match event {
            ProvisioneeEvent::AdvanceLocal => {
                self.enter(context, ProvisioneeState::StartProvisioning);
                Transition(State::exchange())
            }
            _ => Super,
        }
    }

    #[state(superstate = "running")]
    fn exchange(&mut self, context: &mut DispatchContext, event: &ProvisioneeEvent) -> Outcome<State> {
        match *event {
            ProvisioneeEvent::Report {
                can_proceed: false,
                ..
            } => {
                self.current = ProvisioneeState::Failure;
                context.status = DispatchStatus::Stopped;
                Transition(State::failure())
            }
            ProvisioneeEvent::Report {
                next_state: None, ..
            } => {
                context.status = DispatchStatus::Repeated;
                Handled
            }
            ProvisioneeEvent::Report {
                next_state: Some(ProvisioneeState::NotProvisioned),
                ..
            } => {
                self.enter(context, ProvisioneeState::NotProvisioned);
                Transition(State::not_provisioned())
            }
            ProvisioneeEvent::Report {
                next_state: Some(ProvisioneeState::Done),
                ..
            } => {
                self.enter(context, ProvisioneeState::Done);
                Transition(State::done())
            }
            ProvisioneeEvent::Report {
                next_state: Some(next),
                ..
            } if next.is_exchange() => {
                self.enter(context, next);
                Transition(State::exchange())
            }
            _ => Super,
        }
    }

    #[state(superstate = "finished")]
    fn done(&mut self, context: &mut DispatchContext, event: &ProvisioneeEvent) -> Outcome<State> {
        let _ = (context, event);
        Super
    }

    #[state(superstate = "finished")]
    fn failure(&mut self, context: &mut DispatchContext, event: &ProvisioneeEvent) -> Outcome<State> {
        let _ = (context, event);
        Super
    }

    #[state(superstate = "finished")]
    fn terminated(
        &mut self,
        context: &mut DispatchContext,
        event: &ProvisioneeEvent,
    ) -> Outcome<State> {
        let _ = (context, event);
        Super
    }

    #[superstate]
    fn running(&mut self, context: &mut DispatchContext, event: &ProvisioneeEvent) -> Outcome<State> {
        match event {
            ProvisioneeEvent::Terminate => {
                self.enter(context, ProvisioneeState::Terminated);
                Transition(State::terminated())
            }
            ProvisioneeEvent::Fail => {
                self.current = ProvisioneeState::Failure;
                context.status = DispatchStatus::Stopped;
                Transition(State::failure())
            }
            _ => Handled,
        }
    }

    #[superstate]
    fn finished(&mut self, context: &mut DispatchContext, event: &ProvisioneeEvent) -> Outcome<State> {
        let _ = (context, event);
        Handled
    }
}
