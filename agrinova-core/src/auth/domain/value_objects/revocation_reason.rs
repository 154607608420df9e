use std::fmt;

/// Canonical reasons for revoking tokens, bindings, and sessions.
///
/// Stored once per record; the first recorded reason wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    /// Family replaced by a refresh exchange.
    Rotation,
    /// A new login on the same device superseded earlier tokens.
    LoginSuperseded,
    /// Offline renewal replaced the device's token families.
    DeviceRenewed,
    /// The device binding was removed.
    DeviceUnbound,
    /// User explicitly logged out.
    UserLogout,
    /// User-initiated password change.
    PasswordChange,
    /// Administrator action.
    Admin,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rotation => "rotation",
            Self::LoginSuperseded => "login_superseded",
            Self::DeviceRenewed => "device_renewed",
            Self::DeviceUnbound => "device_unbound",
            Self::UserLogout => "user_logout",
            Self::PasswordChange => "password_change",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
