use constant_time_eq::constant_time_eq;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceFingerprintError {
    #[error("Device fingerprint must not be empty")]
    Empty,

    #[error("Device fingerprint exceeds {max} characters", max = DeviceFingerprint::MAX_LEN)]
    TooLong,
}

/// Client-reported fingerprint pinned to a device binding.
///
/// The value is opaque to the server; it only has to stay stable for a given
/// physical device. Comparison is constant-time.
#[derive(Clone)]
pub struct DeviceFingerprint {
    value: String,
}

impl DeviceFingerprint {
    pub const MAX_LEN: usize = 512;

    pub fn new(value: impl Into<String>) -> Result<Self, DeviceFingerprintError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(DeviceFingerprintError::Empty);
        }
        if value.len() > Self::MAX_LEN {
            return Err(DeviceFingerprintError::TooLong);
        }
        Ok(Self { value })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn matches(&self, other: &DeviceFingerprint) -> bool {
        self.matches_str(other.as_str())
    }

    pub fn matches_str(&self, other: &str) -> bool {
        constant_time_eq(self.value.as_bytes(), other.trim().as_bytes())
    }
}

impl PartialEq for DeviceFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for DeviceFingerprint {}

impl fmt::Debug for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.value.chars().take(8).collect();
        f.debug_tuple("DeviceFingerprint")
            .field(&format!("{shown}…"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_and_oversized() {
        assert_eq!(
            DeviceFingerprint::new("   "),
            Err(DeviceFingerprintError::Empty)
        );
        assert_eq!(
            DeviceFingerprint::new("x".repeat(513)),
            Err(DeviceFingerprintError::TooLong)
        );
    }

    #[test]
    fn comparison_ignores_surrounding_whitespace() {
        let fp = DeviceFingerprint::new("abc123").unwrap();
        assert!(fp.matches_str(" abc123 "));
        assert!(!fp.matches_str("abc124"));
    }
}
