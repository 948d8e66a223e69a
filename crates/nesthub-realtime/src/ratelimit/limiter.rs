//! Fixed-window rate limiter.
//!
//! One window per (user, category) plus one global window per user. The
//! global window is evaluated first and short-circuits: global exhaustion
//! always wins. Admission increments both counters together; a rejection
//! increments neither. Windows reset lazily when a check observes that the
//! reset time has passed, so no background timer is needed for
//! correctness; a periodic [`RateLimiter::sweep`] reclaims idle memory.
//!
//! Fixed windows permit a burst of up to 2x max at a window boundary.
//! This imprecision is accepted; switching to sliding windows would change
//! observable throttling behavior.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use nesthub_core::config::ratelimit::{RateLimitConfig, WindowConfig};
use nesthub_entity::chat::MessageCategory;

/// Admission category for an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    /// A chat message; windowed per message category.
    Chat(MessageCategory),
    /// Room join requests.
    JoinRoom,
    /// Typing indicators; no category window, global only.
    Typing,
    /// Liveness pings; generous ceiling.
    Heartbeat,
    /// Task-scoped resource events.
    TaskEvent,
    /// Goal-scoped resource events.
    GoalEvent,
}

impl RateCategory {
    /// Configuration key for this category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat(category) => category.as_str(),
            Self::JoinRoom => "join_room",
            Self::Typing => "typing",
            Self::Heartbeat => "heartbeat",
            Self::TaskEvent => "task_event",
            Self::GoalEvent => "goal_event",
        }
    }
}

/// Which window caused a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// The per-user global window.
    Global,
    /// The per-category window.
    Category,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    /// Whether the request was admitted.
    pub allowed: bool,
    /// Requests remaining in the deciding window after this call.
    pub remaining: u32,
    /// When the deciding window resets.
    pub reset_at: DateTime<Utc>,
    /// On rejection, which window rejected.
    pub reason: Option<LimitScope>,
}

/// A single counting window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

impl Window {
    fn new(reset_at: DateTime<Utc>) -> Self {
        Self { count: 0, reset_at }
    }

    /// Lazy reset: zero the counter once the reset time has passed.
    fn reset_if_due(&mut self, now: DateTime<Utc>, duration: Duration) {
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + duration;
        }
    }

    /// Whether the window has expired (its logical count is zero).
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}

/// Per-user limiter state: one global window plus per-category windows,
/// created lazily on first use.
#[derive(Debug)]
struct UserWindows {
    global: Window,
    categories: HashMap<&'static str, Window>,
}

/// Fixed-window admission controller, keyed by user and category.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    users: DashMap<Uuid, UserWindows>,
}

impl RateLimiter {
    /// Create a limiter from configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            users: DashMap::new(),
        }
    }

    /// Window configuration for a category, if the category is windowed.
    ///
    /// Typing indicators count only against the global window; every other
    /// category uses its configured window or the generic fallback.
    fn category_window(&self, category: RateCategory) -> Option<WindowConfig> {
        match category {
            RateCategory::Typing => None,
            other => Some(
                self.config
                    .categories
                    .get(other.name())
                    .copied()
                    .unwrap_or(self.config.default),
            ),
        }
    }

    /// Check admission for one request and, if admitted, consume one unit
    /// from both the global and category windows.
    pub fn check_and_consume(&self, user_id: Uuid, category: RateCategory) -> RateLimitDecision {
        self.check_and_consume_at(user_id, category, Utc::now())
    }

    /// Time-parameterized variant of [`Self::check_and_consume`].
    pub fn check_and_consume_at(
        &self,
        user_id: Uuid,
        category: RateCategory,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let global_duration = Duration::milliseconds(self.config.global.duration_ms as i64);

        let mut entry = self.users.entry(user_id).or_insert_with(|| UserWindows {
            global: Window::new(now + global_duration),
            categories: HashMap::new(),
        });
        let windows = entry.value_mut();

        windows.global.reset_if_due(now, global_duration);

        // Global window first; its exhaustion always wins and the category
        // window is not touched.
        if windows.global.count >= self.config.global.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: windows.global.reset_at,
                reason: Some(LimitScope::Global),
            };
        }

        match self.category_window(category) {
            None => {
                windows.global.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: self.config.global.max_requests - windows.global.count,
                    reset_at: windows.global.reset_at,
                    reason: None,
                }
            }
            Some(window_config) => {
                let duration = Duration::milliseconds(window_config.duration_ms as i64);
                let window = windows
                    .categories
                    .entry(category.name())
                    .or_insert_with(|| Window::new(now + duration));
                window.reset_if_due(now, duration);

                if window.count >= window_config.max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: window.reset_at,
                        reason: Some(LimitScope::Category),
                    };
                }

                // Both counters move together; a rejection above leaves
                // neither incremented.
                window.count += 1;
                windows.global.count += 1;

                RateLimitDecision {
                    allowed: true,
                    remaining: window_config.max_requests - window.count,
                    reset_at: window.reset_at,
                    reason: None,
                }
            }
        }
    }

    /// Read-only inspection of a user's current windows.
    ///
    /// Expired windows report a count of zero without being mutated.
    pub fn status(&self, user_id: Uuid) -> Vec<(String, u32, DateTime<Utc>)> {
        self.status_at(user_id, Utc::now())
    }

    /// Time-parameterized variant of [`Self::status`].
    pub fn status_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Vec<(String, u32, DateTime<Utc>)> {
        let Some(entry) = self.users.get(&user_id) else {
            return Vec::new();
        };

        let view = |name: &str, window: &Window| {
            let count = if window.is_expired(now) { 0 } else { window.count };
            (name.to_string(), count, window.reset_at)
        };

        let mut status = vec![view("global", &entry.global)];
        status.extend(
            entry
                .categories
                .iter()
                .map(|(name, window)| view(name, window)),
        );
        status
    }

    /// Administrative override: clear a user's counters entirely.
    ///
    /// Does not bypass future checks, only clears history.
    pub fn reset(&self, user_id: Uuid) {
        self.users.remove(&user_id);
    }

    /// Garbage collection sweep.
    ///
    /// Removes per-category windows whose reset time has passed (their
    /// logical count is zero), and removes a user's whole record once the
    /// global window has expired and no category windows remain.
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }

    /// Time-parameterized variant of [`Self::sweep`].
    pub fn sweep_at(&self, now: DateTime<Utc>) {
        self.users.retain(|_, windows| {
            windows.categories.retain(|_, window| !window.is_expired(now));
            !(windows.categories.is_empty() && windows.global.is_expired(now))
        });
    }

    /// Number of users with live limiter state.
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        let mut config = RateLimitConfig::default();
        config.global = WindowConfig::new(60_000, 10);
        config.default = WindowConfig::new(60_000, 5);
        config.categories =
            HashMap::from([("real_time_chat".to_string(), WindowConfig::new(60_000, 3))]);
        config
    }

    fn chat() -> RateCategory {
        RateCategory::Chat(MessageCategory::RealTimeChat)
    }

    #[test]
    fn test_admission_up_to_category_max() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();

        for i in 0..3 {
            let decision = limiter.check_and_consume(user, chat());
            assert!(decision.allowed, "request {i} should be admitted");
            assert_eq!(decision.remaining, 2 - i);
        }

        let rejected = limiter.check_and_consume(user, chat());
        assert!(!rejected.allowed);
        assert_eq!(rejected.reason, Some(LimitScope::Category));
    }

    #[test]
    fn test_rejection_does_not_partially_increment() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();

        for _ in 0..3 {
            assert!(limiter.check_and_consume(user, chat()).allowed);
        }
        // Exhaust the chat window; the global counter must stay at 3.
        assert!(!limiter.check_and_consume(user, chat()).allowed);
        assert!(!limiter.check_and_consume(user, chat()).allowed);

        let status = limiter.status(user);
        let global = status.iter().find(|(name, _, _)| name == "global").unwrap();
        assert_eq!(global.1, 3);
    }

    #[test]
    fn test_window_reset_starts_fresh() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();
        let start = Utc::now();

        for _ in 0..3 {
            assert!(limiter.check_and_consume_at(user, chat(), start).allowed);
        }
        assert!(!limiter.check_and_consume_at(user, chat(), start).allowed);

        // Past the reset time, the next admission counts 1, not 4.
        let later = start + Duration::milliseconds(60_001);
        let decision = limiter.check_and_consume_at(user, chat(), later);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[test]
    fn test_global_window_short_circuits() {
        let mut config = test_config();
        config.global = WindowConfig::new(60_000, 2);
        config.categories =
            HashMap::from([("real_time_chat".to_string(), WindowConfig::new(60_000, 100))]);
        let limiter = RateLimiter::new(config);
        let user = Uuid::new_v4();

        assert!(limiter.check_and_consume(user, chat()).allowed);
        assert!(limiter.check_and_consume(user, chat()).allowed);

        let rejected = limiter.check_and_consume(user, chat());
        assert!(!rejected.allowed);
        assert_eq!(rejected.reason, Some(LimitScope::Global));

        // Category window must not have been consumed by the rejection.
        let status = limiter.status(user);
        let category = status
            .iter()
            .find(|(name, _, _)| name == "real_time_chat")
            .unwrap();
        assert_eq!(category.1, 2);
    }

    #[test]
    fn test_typing_counts_only_against_global() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();

        for _ in 0..10 {
            assert!(limiter.check_and_consume(user, RateCategory::Typing).allowed);
        }
        let rejected = limiter.check_and_consume(user, RateCategory::Typing);
        assert!(!rejected.allowed);
        assert_eq!(rejected.reason, Some(LimitScope::Global));
    }

    #[test]
    fn test_unlisted_category_uses_fallback() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();

        // join_room has no explicit entry in the test config; fallback is 5.
        for _ in 0..5 {
            assert!(limiter.check_and_consume(user, RateCategory::JoinRoom).allowed);
        }
        assert!(!limiter.check_and_consume(user, RateCategory::JoinRoom).allowed);
    }

    #[test]
    fn test_status_read_does_not_consume() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();

        assert!(limiter.check_and_consume(user, chat()).allowed);
        let before = limiter.status(user);
        let after = limiter.status(user);
        assert_eq!(before.len(), after.len());

        let category = after
            .iter()
            .find(|(name, _, _)| name == "real_time_chat")
            .unwrap();
        assert_eq!(category.1, 1);
    }

    #[test]
    fn test_status_reports_zero_after_expiry() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();
        let start = Utc::now();

        assert!(limiter.check_and_consume_at(user, chat(), start).allowed);

        let later = start + Duration::milliseconds(60_001);
        let status = limiter.status_at(user, later);
        let category = status
            .iter()
            .find(|(name, _, _)| name == "real_time_chat")
            .unwrap();
        assert_eq!(category.1, 0);
    }

    #[test]
    fn test_reset_clears_history() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();

        for _ in 0..3 {
            assert!(limiter.check_and_consume(user, chat()).allowed);
        }
        assert!(!limiter.check_and_consume(user, chat()).allowed);

        limiter.reset(user);
        assert!(limiter.check_and_consume(user, chat()).allowed);
    }

    #[test]
    fn test_sweep_reclaims_expired_users() {
        let limiter = RateLimiter::new(test_config());
        let user = Uuid::new_v4();
        let start = Utc::now();

        assert!(limiter.check_and_consume_at(user, chat(), start).allowed);
        assert_eq!(limiter.tracked_users(), 1);

        limiter.sweep_at(start + Duration::milliseconds(1));
        assert_eq!(limiter.tracked_users(), 1, "live windows must survive");

        limiter.sweep_at(start + Duration::milliseconds(60_001));
        assert_eq!(limiter.tracked_users(), 0);
    }

    #[test]
    fn test_chat_scenario_thirty_per_minute() {
        let mut config = RateLimitConfig::default();
        config.global = WindowConfig::new(60_000, 200);
        config.categories =
            HashMap::from([("real_time_chat".to_string(), WindowConfig::new(60_000, 30))]);
        let limiter = RateLimiter::new(config);
        let user = Uuid::new_v4();
        let now = Utc::now();

        for _ in 0..10 {
            assert!(limiter.check_and_consume_at(user, chat(), now).allowed);
        }
        let status = limiter.status_at(user, now);
        let category = status
            .iter()
            .find(|(name, _, _)| name == "real_time_chat")
            .unwrap();
        assert_eq!(category.1, 10);

        for i in 10..30 {
            let decision = limiter.check_and_consume_at(user, chat(), now);
            assert!(decision.allowed, "message {} should pass", i + 1);
        }
        let thirty_first = limiter.check_and_consume_at(user, chat(), now);
        assert!(!thirty_first.allowed);
        assert_eq!(thirty_first.reason, Some(LimitScope::Category));
    }
}
