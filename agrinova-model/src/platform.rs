use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Client platform a login originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Platform {
    #[default]
    Web,
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Web => "WEB",
            Platform::Android => "ANDROID",
            Platform::Ios => "IOS",
        }
    }

    /// Mobile platforms go through device binding; web does not.
    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEB" => Ok(Platform::Web),
            "ANDROID" => Ok(Platform::Android),
            "IOS" => Ok(Platform::Ios),
            other => Err(ModelError::UnknownPlatform(other.to_string())),
        }
    }
}

/// How a session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum LoginMethod {
    Password,
    Biometric,
    TwoFactor,
    Sso,
}

impl LoginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginMethod::Password => "PASSWORD",
            LoginMethod::Biometric => "BIOMETRIC",
            LoginMethod::TwoFactor => "TWO_FACTOR",
            LoginMethod::Sso => "SSO",
        }
    }
}

impl Display for LoginMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASSWORD" => Ok(LoginMethod::Password),
            "BIOMETRIC" => Ok(LoginMethod::Biometric),
            "TWO_FACTOR" => Ok(LoginMethod::TwoFactor),
            "SSO" => Ok(LoginMethod::Sso),
            other => Err(ModelError::UnknownLoginMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_android_and_ios_are_mobile() {
        assert!(!Platform::Web.is_mobile());
        assert!(Platform::Android.is_mobile());
        assert!(Platform::Ios.is_mobile());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("IOS".parse::<Platform>(), Ok(Platform::Ios));
        assert!("ios".parse::<Platform>().is_err());
        assert_eq!(
            "TWO_FACTOR".parse::<LoginMethod>(),
            Ok(LoginMethod::TwoFactor)
        );
    }
}
