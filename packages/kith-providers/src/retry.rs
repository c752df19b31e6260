use std::{future::Future, time::Duration};

use crate::Result;

/// Run `op`, retrying transient failures with a doubling delay. Auth and
/// response-shape errors surface immediately.
pub async fn with_backoff<T, F, Fut>(max_retries: u32, base_delay: Duration, mut op: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut attempt = 0_u32;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_retryable() && attempt < max_retries => {
				let delay = backoff_for_attempt(base_delay, attempt);

				tracing::debug!(error = %err, attempt, "Retrying after transient provider error.");
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

fn backoff_for_attempt(base_delay: Duration, attempt: u32) -> Duration {
	base_delay.saturating_mul(1_u32 << attempt.min(6))
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;
	use crate::Error;

	#[tokio::test]
	async fn retries_transient_until_success() {
		let calls = AtomicU32::new(0);
		let result = with_backoff(3, Duration::ZERO, || {
			let attempt = calls.fetch_add(1, Ordering::SeqCst);

			async move {
				if attempt < 2 { Err(Error::Transient("flaky".to_string())) } else { Ok(attempt) }
			}
		})
		.await;

		assert_eq!(result.unwrap(), 2);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn never_retries_auth_errors() {
		let calls = AtomicU32::new(0);
		let result: Result<()> = with_backoff(5, Duration::ZERO, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(Error::Auth("bad key".to_string())) }
		})
		.await;

		assert!(matches!(result, Err(Error::Auth(_))));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn gives_up_after_max_retries() {
		let calls = AtomicU32::new(0);
		let result: Result<()> = with_backoff(2, Duration::ZERO, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(Error::Transient("down".to_string())) }
		})
		.await;

		assert!(matches!(result, Err(Error::Transient(_))));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let base = Duration::from_millis(100);

		assert_eq!(backoff_for_attempt(base, 0), Duration::from_millis(100));
		assert_eq!(backoff_for_attempt(base, 1), Duration::from_millis(200));
		assert_eq!(backoff_for_attempt(base, 3), Duration::from_millis(800));
		assert_eq!(backoff_for_attempt(base, 10), backoff_for_attempt(base, 6));
	}
}
