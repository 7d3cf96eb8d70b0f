//! Placeholder substitution for ARM parameters and environment files.

pub mod env_file;
pub mod parameters;
pub mod placeholders;

pub use env_file::{EnvFileRenderer, EnvFileSpec, RenderedEnvFile, render_env_file, verify_env_file};
pub use parameters::{ParametersFile, PreparedParameters, load_json};
pub use placeholders::{Placeholder, SubstitutionValues, substitute, unresolved_placeholders};
