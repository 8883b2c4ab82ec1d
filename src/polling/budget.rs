use crate::domain::ports::Clock;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_NETWORK_TIMEOUT_FLOOR: Duration = Duration::from_secs(60);

/// A non-renewable allowance to keep polling one resource.
///
/// The budget is checked *after* each scheduled delay has elapsed: the attempt
/// that was already waiting when time ran out still fires, and only later
/// attempts are refused. Once `can_poll` turns false it stays false; a new
/// allowance needs a new budget.
#[derive(Debug, Clone)]
pub struct PollingBudget {
    start: Instant,
    duration: Duration,
    poll_interval: Duration,
    network_timeout_floor: Duration,
    last_attempt: Option<Instant>,
    attempts: u32,
    max_attempts: Option<u32>,
    can_poll: bool,
}

impl PollingBudget {
    pub fn new(start: Instant, duration: Duration) -> Self {
        Self::with_limits(
            start,
            duration,
            DEFAULT_POLL_INTERVAL,
            DEFAULT_NETWORK_TIMEOUT_FLOOR,
        )
    }

    pub fn with_limits(
        start: Instant,
        duration: Duration,
        poll_interval: Duration,
        network_timeout_floor: Duration,
    ) -> Self {
        Self {
            start,
            duration,
            poll_interval,
            network_timeout_floor,
            last_attempt: None,
            attempts: 0,
            max_attempts: None,
            can_poll: true,
        }
    }

    /// Closes the budget once `max_attempts` polls have fired, whatever time is left.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn can_poll(&self) -> bool {
        self.can_poll
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Timeout for the next request: whatever is left of the budget, but never
    /// less than the floor so the final poll still gets a fair chance.
    pub fn network_timeout(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(self.elapsed(now))
            .max(self.network_timeout_floor)
    }

    /// How long to wait before the next attempt may fire.
    pub fn next_poll_delay(&self, now: Instant) -> Duration {
        let since = now.saturating_duration_since(self.last_attempt.unwrap_or(self.start));
        self.poll_interval.saturating_sub(since)
    }

    /// Marks an attempt as fired at `now` and closes the budget if it has run out.
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
        self.attempts += 1;
        let exhausted = self
            .max_attempts
            .is_some_and(|max_attempts| self.attempts >= max_attempts);
        if exhausted || self.elapsed(now) > self.duration {
            self.can_poll = false;
        }
    }

    /// Waits out the back-off delay, then records the attempt. The caller issues
    /// the poll once this resolves, whatever `can_poll` says afterwards.
    pub async fn poll_after(&mut self, clock: &dyn Clock) {
        let delay = self.next_poll_delay(clock.now());
        if !delay.is_zero() {
            clock.sleep(delay).await;
        }
        self.record_attempt(clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::TokioClock;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_budget_can_poll() {
        let budget = PollingBudget::new(Instant::now(), Duration::from_secs(5));
        assert!(budget.can_poll());
        assert!(budget.last_attempt().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_timeout_floor() {
        let start = Instant::now();
        let budget = PollingBudget::new(start, Duration::from_secs(90));

        assert_eq!(budget.network_timeout(start), Duration::from_secs(90));
        assert_eq!(
            budget.network_timeout(start + Duration::from_secs(20)),
            Duration::from_secs(70)
        );
        assert_eq!(
            budget.network_timeout(start + Duration::from_secs(45)),
            Duration::from_secs(60)
        );
        assert_eq!(
            budget.network_timeout(start + Duration::from_secs(500)),
            Duration::from_secs(60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_delay_counts_from_start() {
        let start = Instant::now();
        let budget = PollingBudget::new(start, Duration::from_secs(5));
        assert_eq!(budget.next_poll_delay(start), Duration::from_secs(1));
        assert_eq!(
            budget.next_poll_delay(start + Duration::from_millis(300)),
            Duration::from_millis(700)
        );
        assert_eq!(
            budget.next_poll_delay(start + Duration::from_secs(3)),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_closes_only_after_delay_fires() {
        let start = Instant::now();
        let mut budget = PollingBudget::new(start, Duration::from_secs(5));

        budget.record_attempt(start + Duration::from_secs(5));
        assert!(budget.can_poll(), "elapsed == duration still allows polling");

        budget.record_attempt(start + Duration::from_millis(5_001));
        assert!(!budget.can_poll());

        // Monotonic: an earlier timestamp never reopens it.
        budget.record_attempt(start + Duration::from_secs(1));
        assert!(!budget.can_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_after_spaces_attempts() {
        let clock = TokioClock;
        let start = clock.now();
        let mut budget = PollingBudget::new(start, Duration::from_secs(5));

        budget.poll_after(&clock).await;
        assert_eq!(clock.now() - start, Duration::from_secs(1));
        budget.poll_after(&clock).await;
        assert_eq!(clock.now() - start, Duration::from_secs(2));
        assert_eq!(budget.last_attempt(), Some(start + Duration::from_secs(2)));
        assert!(budget.can_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_after_exhausts_budget() {
        let clock = TokioClock;
        let mut budget = PollingBudget::new(clock.now(), Duration::from_secs(5));

        let mut fired = 0;
        while budget.can_poll() {
            budget.poll_after(&clock).await;
            fired += 1;
        }
        // Attempts at 1s..=6s; the one at 6s is the in-flight attempt that closes it.
        assert_eq!(fired, 6);
        assert!(!budget.can_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_closes_before_duration() {
        let start = Instant::now();
        let mut budget =
            PollingBudget::new(start, Duration::from_secs(1)).with_max_attempts(1);

        budget.record_attempt(start + Duration::from_secs(1));
        assert_eq!(budget.attempts(), 1);
        assert!(!budget.can_poll(), "a capped budget stops at its last attempt");
    }
}
