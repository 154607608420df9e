//! Rate limiting for authentication endpoints.
//!
//! Login failures are counted per client address and identifier. Once a key
//! exceeds its rule it is blocked for a backoff period; a successful login
//! clears the key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agrinova_model::{RateLimitKey, RateLimitRule};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use super::error::{AuthError, AuthResult};

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded: {reason}")]
    RateLimitExceeded {
        reason: String,
        retry_after: Duration,
        violations: u32,
    },

    #[error("backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

pub type RateLimitResult<T> = Result<T, RateLimitError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Attempts counted in the current window.
    pub current_count: u32,
    pub limit: u32,
    /// Time until the key may try again; zero when allowed.
    pub reset_after: Duration,
    pub violation_count: u32,
}

/// Rate limiter backends.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one attempt against `key` and report whether it was within
    /// the rule. The attempt that crosses the limit starts a block.
    async fn check_and_update(
        &self,
        key: &RateLimitKey,
        rule: &RateLimitRule,
    ) -> RateLimitResult<RateLimitDecision>;

    /// Current state without counting anything.
    async fn get_current_state(
        &self,
        key: &RateLimitKey,
        rule: &RateLimitRule,
    ) -> RateLimitResult<RateLimitDecision>;

    async fn reset(&self, key: &RateLimitKey) -> RateLimitResult<()>;

    /// Drop keys with no attempts in their window and no active block.
    async fn cleanup_expired(&self) -> RateLimitResult<u64>;
}

const NAMESPACE: &str = "auth";

#[derive(Debug)]
struct WindowEntry {
    hits: Vec<Instant>,
    window: Duration,
    violations: u32,
    blocked_until: Option<Instant>,
}

impl WindowEntry {
    fn new(window: Duration) -> Self {
        Self {
            hits: Vec::new(),
            window,
            violations: 0,
            blocked_until: None,
        }
    }

    fn live_hits(&self, now: Instant) -> u32 {
        let live = self
            .hits
            .iter()
            .filter(|&&hit| now.duration_since(hit) < self.window)
            .count();
        u32::try_from(live).unwrap_or(u32::MAX)
    }

    fn blocked_for(&self, now: Instant) -> Option<Duration> {
        self.blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.blocked_for(now).is_none() && self.live_hits(now) == 0
    }

    fn decision(
        &self,
        rule: &RateLimitRule,
        now: Instant,
        reset_after: Option<Duration>,
    ) -> RateLimitDecision {
        RateLimitDecision {
            allowed: reset_after.is_none(),
            current_count: self.live_hits(now),
            limit: rule.limit,
            reset_after: reset_after.unwrap_or(Duration::ZERO),
            violation_count: self.violations,
        }
    }
}

/// Sliding-window limiter for a single server process.
#[derive(Clone, Default)]
pub struct InMemoryRateLimiter {
    entries: Arc<RwLock<HashMap<String, WindowEntry>>>,
}

impl fmt::Debug for InMemoryRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRateLimiter").finish_non_exhaustive()
    }
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_and_update(
        &self,
        key: &RateLimitKey,
        rule: &RateLimitRule,
    ) -> RateLimitResult<RateLimitDecision> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_cache_key(NAMESPACE))
            .or_insert_with(|| WindowEntry::new(rule.window));
        entry.window = rule.window;
        entry.hits.retain(|&hit| now.duration_since(hit) < rule.window);

        if let Some(wait) = entry.blocked_for(now) {
            return Ok(entry.decision(rule, now, Some(wait)));
        }

        entry.hits.push(now);
        if entry.live_hits(now) <= rule.limit {
            return Ok(entry.decision(rule, now, None));
        }

        entry.violations = entry.violations.saturating_add(1);
        let block = rule.block_duration(entry.violations);
        entry.blocked_until = Some(now + block);
        entry.hits.clear();
        warn!(
            target: "agrinova::auth",
            rule = %rule.name,
            violations = entry.violations,
            block_secs = block.as_secs(),
            "rate limit exceeded"
        );
        Ok(entry.decision(rule, now, Some(block)))
    }

    async fn get_current_state(
        &self,
        key: &RateLimitKey,
        rule: &RateLimitRule,
    ) -> RateLimitResult<RateLimitDecision> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(&key.to_cache_key(NAMESPACE)) {
            Some(entry) => entry.decision(rule, now, entry.blocked_for(now)),
            None => WindowEntry::new(rule.window).decision(rule, now, None),
        })
    }

    async fn reset(&self, key: &RateLimitKey) -> RateLimitResult<()> {
        self.entries
            .write()
            .await
            .remove(&key.to_cache_key(NAMESPACE));
        Ok(())
    }

    async fn cleanup_expired(&self) -> RateLimitResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}

/// Login-attempt budget: checked before credentials are verified, spent on
/// bad credentials, cleared on success.
///
/// Backend errors fail open and are logged.
#[derive(Clone)]
pub struct LoginThrottle {
    limiter: Arc<dyn RateLimiter>,
    rule: RateLimitRule,
}

impl fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

impl LoginThrottle {
    pub fn new(limiter: Arc<dyn RateLimiter>, rule: RateLimitRule) -> Self {
        Self { limiter, rule }
    }

    pub fn rule(&self) -> &RateLimitRule {
        &self.rule
    }

    pub async fn ensure_allowed(&self, key: &RateLimitKey) -> AuthResult<()> {
        match self.limiter.get_current_state(key, &self.rule).await {
            Ok(decision) if !decision.allowed => Err(AuthError::RateLimited {
                retry_after: decision.reset_after,
            }),
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(target: "agrinova::auth", error = %err, "rate limiter unavailable");
                Ok(())
            }
        }
    }

    /// Spend one attempt. Errors when this failure exhausted the budget.
    pub async fn record_failure(&self, key: &RateLimitKey) -> AuthResult<()> {
        match self.limiter.check_and_update(key, &self.rule).await {
            Ok(decision) if !decision.allowed => {
                info!(
                    target: "agrinova::auth",
                    key = %key.to_cache_key(NAMESPACE),
                    violations = decision.violation_count,
                    "login attempts blocked"
                );
                Err(AuthError::RateLimited {
                    retry_after: decision.reset_after,
                })
            }
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(target: "agrinova::auth", error = %err, "rate limiter unavailable");
                Ok(())
            }
        }
    }

    pub async fn clear(&self, key: &RateLimitKey) {
        if let Err(err) = self.limiter.reset(key).await {
            warn!(target: "agrinova::auth", error = %err, "failed to reset rate limit");
        }
    }
}
