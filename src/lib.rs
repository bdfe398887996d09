// Plutus — Library root
//
// Key custody and 2-of-3 escrow provisioning for a payment gateway.

pub mod api;
pub mod cli;
pub mod config;
pub mod custody;
pub mod error;
pub mod rpc;
pub mod store;
pub mod throttle;

pub use error::{PlutusError, Result};
