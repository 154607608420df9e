//! Identity, role, device, and scope models shared across Agrinova crates.
#![allow(missing_docs)]

pub mod device;
pub mod error;
pub mod platform;
pub mod policy;
pub mod rate_limit;
pub mod role;
pub mod scope;
pub mod token;
pub mod user;

pub use device::DeviceInfo;
pub use error::{ModelError, Result as ModelResult};
pub use platform::{LoginMethod, Platform};
pub use policy::{DeviceTrustPolicy, RefreshRotation};
pub use rate_limit::{RateLimitKey, RateLimitRule};
pub use role::{Role, ScopeLevel};
pub use scope::ScopeGrants;
pub use token::{OFFLINE_ACCESS_SCOPE, TokenKind, TokenRecordType};
pub use user::UserProfile;
