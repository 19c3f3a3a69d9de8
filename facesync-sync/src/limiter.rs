//! Token bucket pacing photo uploads.
//!
//! The bucket holds a single token and tracks when the next one becomes
//! available instead of counting tokens, so no background refill task is
//! needed. Idle time never banks more than one token.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_at: Option<Instant>,
}

impl RateLimiter {
    /// One token per `interval`.
    pub fn per_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_at: None,
        }
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&mut self) {
        let now = Instant::now();
        let ready_at = self.next_at.map_or(now, |t| t.max(now));
        if ready_at > now {
            tokio::time::sleep_until(ready_at).await;
        }
        self.next_at = Some(ready_at + self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn first_token_is_immediate() {
        let mut limiter = RateLimiter::per_interval(Duration::from_millis(1500));
        let started = Instant::now();
        limiter.acquire().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn tokens_are_spaced_by_interval() {
        let mut limiter = RateLimiter::per_interval(Duration::from_millis(1500));
        let started = Instant::now();
        let mut stamps = Vec::new();
        for _ in 0..4 {
            limiter.acquire().await;
            stamps.push(started.elapsed());
        }
        assert_eq!(
            stamps,
            vec![
                Duration::ZERO,
                Duration::from_millis(1500),
                Duration::from_millis(3000),
                Duration::from_millis(4500),
            ]
        );
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn idle_time_does_not_bank_extra_tokens() {
        let mut limiter = RateLimiter::per_interval(Duration::from_millis(1500));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(60)).await;

        let started = Instant::now();
        limiter.acquire().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
        limiter.acquire().await;
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }
}
