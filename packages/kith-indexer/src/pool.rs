use std::sync::Arc;

use time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
	process::{Outcome, UserProcessor},
	stats::PhaseCounters,
};

/// Tally of one batch run, one increment per submitted user.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchOutcome {
	pub indexed: u64,
	pub skipped: u64,
	pub removed: u64,
	pub failed: u64,
}
impl BatchOutcome {
	pub fn into_counters(self) -> PhaseCounters {
		PhaseCounters {
			indexed: self.indexed,
			skipped_unchanged: self.skipped,
			removed_consent: self.removed,
			failed: self.failed,
		}
	}
}

struct WorkerReport {
	user_id: String,
	result: color_eyre::Result<Outcome>,
}

/// Fan the batch out over `workers` tasks behind a bounded queue. The
/// producer stops enqueueing once `cancel` fires; everything already queued
/// is still drained so no user is half-processed.
pub async fn run_batch(
	processor: Arc<UserProcessor>,
	user_ids: Vec<String>,
	ttl: Duration,
	workers: u32,
	queue_depth: u32,
	cancel: &CancellationToken,
) -> BatchOutcome {
	if user_ids.is_empty() {
		return BatchOutcome::default();
	}

	let depth = queue_depth.max(1) as usize;
	let (job_tx, job_rx) = mpsc::channel::<String>(depth);
	let job_rx = Arc::new(Mutex::new(job_rx));
	let (report_tx, mut report_rx) = mpsc::channel::<WorkerReport>(depth);

	for _ in 0..workers.max(1) {
		let processor = processor.clone();
		let job_rx = job_rx.clone();
		let report_tx = report_tx.clone();

		tokio::spawn(async move {
			loop {
				let job = {
					let mut rx = job_rx.lock().await;

					rx.recv().await
				};
				let Some(user_id) = job else {
					break;
				};
				let result = processor.process_user(&user_id, ttl, false).await;

				if report_tx.send(WorkerReport { user_id, result }).await.is_err() {
					break;
				}
			}
		});
	}

	drop(report_tx);

	let producer_cancel = cancel.clone();

	tokio::spawn(async move {
		for user_id in user_ids {
			tokio::select! {
				_ = producer_cancel.cancelled() => break,
				sent = job_tx.send(user_id) => {
					if sent.is_err() {
						break;
					}
				},
			}
		}
	});

	let mut outcome = BatchOutcome::default();

	while let Some(report) = report_rx.recv().await {
		match report.result {
			Ok(Outcome::Indexed) => outcome.indexed += 1,
			Ok(Outcome::Skipped) => outcome.skipped += 1,
			Ok(Outcome::Removed) => outcome.removed += 1,
			Err(err) => {
				outcome.failed += 1;

				tracing::warn!(user_id = %report.user_id, error = %err, "User indexing failed.");
			},
		}
	}

	outcome
}
