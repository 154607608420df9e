// Immutable, validated-on-construction auth values.

mod device_fingerprint;
mod device_id;
mod revocation_reason;

pub use device_fingerprint::{DeviceFingerprint, DeviceFingerprintError};
pub use device_id::DeviceId;
pub use revocation_reason::RevocationReason;
