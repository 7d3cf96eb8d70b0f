pub mod auth_setup;
pub mod azure_ad;
pub mod azure_cli;
pub mod errors;
pub mod provider;
pub mod token_cache;
pub mod types;

pub use auth_setup::{TokenSource, create_auth_provider};
pub use azure_ad::{AzureAdProvider, DeviceCodeCallback, DeviceCodeFlowInfo};
pub use azure_cli::AzureCliProvider;
pub use errors::AuthError;
pub use provider::{AuthProvider, AuthToken};
pub use token_cache::TokenCache;
pub use types::{AuthType, AzureAdAuthConfig, CachedToken, DeviceCodeInfo};
