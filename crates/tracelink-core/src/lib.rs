pub mod config;
pub mod errors;
pub mod ids;
pub mod issuer;
pub mod security;

pub use config::{ListenerAddr, Settings};
pub use errors::ConfigError;
pub use ids::SessionId;
pub use issuer::{SessionToken, TokenIssuer};
pub use security::Credentials;
