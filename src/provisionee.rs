//! Provisioning flow: the state machine and the task that drives it.

mod hsm;
mod machine;
mod state;
mod task;

pub use machine::{Directive, ProvisioningMachine};
pub use state::ProvisioneeState;
pub use task::ProvisioneeTask;
