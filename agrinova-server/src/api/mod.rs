macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned route definitions shared by the router and its clients.
pub mod v1 {
    pub const ROOT: &str = "/api/v1";

    pub mod auth {
        pub const LOGIN: &str = v1_path!("/auth/login");
        pub const REFRESH: &str = v1_path!("/auth/refresh");
        pub const LOGOUT: &str = v1_path!("/auth/logout");

        pub mod device {
            pub const RENEW: &str = v1_path!("/auth/device/renew");
            pub const UNBIND: &str = v1_path!("/auth/device/unbind");
        }

        pub mod offline {
            pub const VALIDATE: &str = v1_path!("/auth/offline/validate");
        }

        pub mod session {
            pub const VALIDATE: &str = v1_path!("/auth/session/validate");
        }
    }

    pub mod me {
        pub const PROFILE: &str = v1_path!("/me");
        pub const SCOPE: &str = v1_path!("/me/scope");
    }

    pub mod admin {
        pub mod devices {
            pub const APPROVE: &str = v1_path!("/admin/devices/approve");
        }
    }
}

pub const HEALTH: &str = "/health";
