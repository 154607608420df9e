//! Shared configuration library for the Agrinova auth server.
//!
//! Loading is layered: process environment wins over `.env`, which wins over
//! an optional TOML file, which wins over built-in defaults. The composed
//! [`Config`] is then checked against guard rails; hard violations fail the
//! load while softer issues surface as [`ConfigWarnings`] for the caller to
//! log.

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, error::ConfigLoadError};
pub use models::{
    AuthConfig, Config, ConfigMetadata, DatabaseConfig, RlsConfig,
    ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
