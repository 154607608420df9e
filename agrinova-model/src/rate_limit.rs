use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a rate limit is counted against.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RateLimitKey {
    /// Client address, without port.
    IpAddress(String),
    /// Login identifier, lowercased.
    Identifier(String),
    /// Address and identifier together.
    Combined {
        ip: Option<String>,
        identifier: Option<String>,
    },
}

impl RateLimitKey {
    /// Key for a login attempt. Identifiers are matched case-insensitively
    /// at login, so they are counted that way too.
    pub fn login(ip: Option<&str>, identifier: &str) -> Self {
        let identifier = identifier.trim().to_lowercase();
        Self::Combined {
            ip: ip.map(str::trim).filter(|ip| !ip.is_empty()).map(str::to_string),
            identifier: (!identifier.is_empty()).then_some(identifier),
        }
    }

    pub fn to_cache_key(&self, namespace: &str) -> String {
        match self {
            Self::IpAddress(ip) => format!("{namespace}:ip:{ip}"),
            Self::Identifier(id) => format!("{namespace}:id:{id}"),
            Self::Combined { ip, identifier } => {
                let parts: Vec<String> = [
                    ip.as_ref().map(|ip| format!("ip:{ip}")),
                    identifier.as_ref().map(|id| format!("id:{id}")),
                ]
                .into_iter()
                .flatten()
                .collect();
                format!("{namespace}:combined:{}", parts.join(":"))
            }
        }
    }
}

/// Configuration for a single rate limiting rule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RateLimitRule {
    /// Name of the rule, used in logs.
    pub name: String,
    /// Attempts allowed inside `window` before the key is blocked.
    pub limit: u32,
    pub window: Duration,
    /// Double the block on every repeated violation.
    pub exponential_backoff: bool,
    /// Block length after the first violation.
    pub backoff_base: Duration,
    pub max_backoff: Duration,
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            limit: 10,
            window: Duration::from_secs(60),
            exponential_backoff: true,
            backoff_base: Duration::from_secs(60),
            max_backoff: Duration::from_secs(3600),
        }
    }
}

impl RateLimitRule {
    /// Failed-login rule. The first block lasts one window.
    pub fn login(limit: u32, window: Duration) -> Self {
        Self {
            name: "login".to_string(),
            limit,
            window,
            backoff_base: window,
            ..Default::default()
        }
    }

    /// How long a key stays blocked after its `violations`-th violation.
    pub fn block_duration(&self, violations: u32) -> Duration {
        if self.exponential_backoff {
            backoff::exponential(self.backoff_base, violations, self.max_backoff)
        } else {
            backoff::linear(self.backoff_base, 1, self.max_backoff)
        }
    }
}

pub mod backoff {
    use std::time::Duration;

    pub fn exponential(base: Duration, violations: u32, max: Duration) -> Duration {
        let multiplier = 2_u32.saturating_pow(violations.saturating_sub(1));
        base.saturating_mul(multiplier).min(max)
    }

    pub fn linear(base: Duration, violations: u32, max: Duration) -> Duration {
        base.saturating_mul(violations).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_keys_ignore_identifier_case() {
        let a = RateLimitKey::login(Some("10.0.0.1"), "Mandor1");
        let b = RateLimitKey::login(Some("10.0.0.1"), " mandor1 ");
        assert_eq!(a, b);
        assert_eq!(a.to_cache_key("auth"), "auth:combined:ip:10.0.0.1:id:mandor1");

        let no_ip = RateLimitKey::login(None, "mandor1");
        assert_eq!(no_ip.to_cache_key("auth"), "auth:combined:id:mandor1");
        assert_ne!(no_ip, a);

        let ip = RateLimitKey::IpAddress("10.0.0.1".into());
        assert_eq!(ip.to_cache_key("auth"), "auth:ip:10.0.0.1");
        let id = RateLimitKey::Identifier("mandor1".into());
        assert_eq!(id.to_cache_key("auth"), "auth:id:mandor1");
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let base = Duration::from_secs(60);
        let max = Duration::from_secs(3600);

        assert_eq!(backoff::exponential(base, 1, max), Duration::from_secs(60));
        assert_eq!(backoff::exponential(base, 2, max), Duration::from_secs(120));
        assert_eq!(backoff::exponential(base, 3, max), Duration::from_secs(240));
        assert_eq!(backoff::exponential(base, 10, max), max);
    }

    #[test]
    fn login_rule_blocks_for_a_window_first() {
        let rule = RateLimitRule::login(5, Duration::from_secs(300));
        assert_eq!(rule.block_duration(1), Duration::from_secs(300));
        assert_eq!(rule.block_duration(2), Duration::from_secs(600));

        let flat = RateLimitRule {
            exponential_backoff: false,
            ..rule
        };
        assert_eq!(flat.block_duration(4), Duration::from_secs(300));
    }
}
