/// Free-form description of a physical device, reported by the client.
///
/// Stored verbatim as a JSON blob next to device bindings and sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceInfo {
    pub model: Option<String>,
    pub brand: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
    pub build_number: Option<String>,
    pub device_name: Option<String>,
}

impl DeviceInfo {
    pub fn is_empty(&self) -> bool {
        self == &DeviceInfo::default()
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}
