//! Command line front end for the azmon provisioning steps.
//!
//! The binary in `main.rs` only wires these modules together; everything it
//! does is reachable from here so the integration tests can drive it.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;

pub use error::{AppError, AppResult};
