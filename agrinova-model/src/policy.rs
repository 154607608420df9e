use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// How newly bound mobile devices are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceTrustPolicy {
    /// New bindings start untrusted and unauthorized.
    Manual,
    /// The first binding a user ever makes is trusted and authorized.
    #[default]
    TrustFirstDevice,
    /// Every new binding is trusted and authorized.
    TrustAll,
}

impl DeviceTrustPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceTrustPolicy::Manual => "manual",
            DeviceTrustPolicy::TrustFirstDevice => "trust_first_device",
            DeviceTrustPolicy::TrustAll => "trust_all",
        }
    }
}

impl Display for DeviceTrustPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceTrustPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(DeviceTrustPolicy::Manual),
            "trust_first_device" | "first" => {
                Ok(DeviceTrustPolicy::TrustFirstDevice)
            }
            "trust_all" | "all" => Ok(DeviceTrustPolicy::TrustAll),
            other => Err(format!("unknown device trust policy: {other}")),
        }
    }
}

/// What happens to the presented refresh token once it has been exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RefreshRotation {
    /// The old family stays valid until it expires naturally.
    Reuse,
    /// The old family is revoked as soon as the new pair is issued.
    #[default]
    RevokeFamily,
}

impl RefreshRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshRotation::Reuse => "reuse",
            RefreshRotation::RevokeFamily => "revoke_family",
        }
    }
}

impl Display for RefreshRotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reuse" => Ok(RefreshRotation::Reuse),
            "revoke_family" | "rotate" => Ok(RefreshRotation::RevokeFamily),
            other => Err(format!("unknown refresh rotation: {other}")),
        }
    }
}
