//! Client side of the device setup service (DSS).
//!
//! [`model`] holds the wire types. [`DssClient`] owns the session, the
//! request and response buffers, and the redirect and signature handling
//! shared by every operation.

pub mod client;
pub mod model;
mod operations;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{DssClient, DssOperation, DssSession};
