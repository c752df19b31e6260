use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

/// Enforces a minimum interval between embedding calls across every worker
/// sharing the limiter. A zero interval disables pacing.
pub struct RateLimiter {
	min_interval: Duration,
	last: Mutex<Option<Instant>>,
}
impl RateLimiter {
	pub fn new(min_interval: Duration) -> Self {
		Self { min_interval, last: Mutex::new(None) }
	}

	pub async fn acquire(&self) {
		if self.min_interval.is_zero() {
			return;
		}

		// The lock is held across the sleep so concurrent callers queue up
		// instead of racing for the same slot.
		let mut last = self.last.lock().await;

		if let Some(previous) = *last {
			let elapsed = previous.elapsed();

			if elapsed < self.min_interval {
				tokio::time::sleep(self.min_interval - elapsed).await;
			}
		}

		*last = Some(Instant::now());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn spaces_out_consecutive_acquires() {
		let limiter = RateLimiter::new(Duration::from_millis(100));
		let started = Instant::now();

		limiter.acquire().await;
		limiter.acquire().await;
		limiter.acquire().await;

		assert!(started.elapsed() >= Duration::from_millis(200));
	}

	#[tokio::test(start_paused = true)]
	async fn zero_interval_never_waits() {
		let limiter = RateLimiter::new(Duration::ZERO);
		let started = Instant::now();

		for _ in 0..10 {
			limiter.acquire().await;
		}

		assert_eq!(started.elapsed(), Duration::ZERO);
	}
}
