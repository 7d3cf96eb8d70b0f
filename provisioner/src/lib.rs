//! # azmon provisioner
//!
//! Library behind the `azmon` command line. It provisions the Azure
//! resources of an Application Insights monitoring sample and writes the
//! resulting keys into local environment files.
//!
//! ## Modules
//!
//! - [`auth`] - Azure CLI, device code and client credential authentication
//! - [`management`] - Azure Resource Manager REST client
//! - [`template`] - Placeholder substitution for parameters and env files
//! - [`suffix`] - Resource name suffix generation
//! - [`deployer`] - The end-to-end provisioning run
//! - [`telemetry`] - Application Insights `log` sink
//! - [`utils`] - Environment variable helpers
//! - [`errors`] - The crate error type

pub mod auth;
pub mod deployer;
pub mod errors;
pub mod management;
pub mod suffix;
pub mod telemetry;
pub mod template;
pub mod utils;

pub use deployer::{Deployer, DeploymentPlan, DeploymentReport};
pub use errors::{ProvisionError, ProvisionResult};
