//! Device-side engine for frustration-free Wi-Fi setup.
//!
//! The crate sequences the exchanges between an unprovisioned device and the
//! device setup service (DSS), from the first session request until the
//! device has joined the user's network. Everything device specific sits
//! behind the traits in [`platform`].
//!
//! Everything runs in caller-supplied fixed buffers; nothing allocates.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod batch_list;
pub mod config;
pub mod dss;
pub mod error;
pub mod iso8601;
pub mod json;
pub mod platform;
pub mod provisionee;
pub mod stream;

pub use batch_list::{BatchHandle, BatchList};
pub use config::ProvisioneeConfig;
pub use error::{FfsError, FfsResult};
pub use provisionee::{Directive, ProvisioneeState, ProvisioneeTask, ProvisioningMachine};
pub use stream::StreamBuffer;
