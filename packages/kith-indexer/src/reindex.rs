use std::{sync::Arc, time::Duration as StdDuration};

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use kith_storage::{
	ReindexStore,
	models::{ItemStatus, JobStatus, ReindexJob},
};

use crate::process::{Outcome, UserProcessor};

/// Retention purges run on every 60th poll tick rather than their own timer.
const PURGE_EVERY_TICKS: u64 = 60;

/// Drains durable reindex jobs one batch per poll tick. Single consumer;
/// claiming is just listing the still-queued items.
pub struct ReindexPoller {
	jobs: Arc<dyn ReindexStore>,
	processor: Arc<UserProcessor>,
	cfg: kith_config::Reindex,
	ttl: Duration,
}

impl ReindexPoller {
	pub fn new(
		jobs: Arc<dyn ReindexStore>,
		processor: Arc<UserProcessor>,
		cfg: kith_config::Reindex,
		ttl_seconds: i64,
	) -> Self {
		Self { jobs, processor, cfg, ttl: Duration::seconds(ttl_seconds) }
	}

	pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
		let mut ticker =
			tokio::time::interval(StdDuration::from_secs(self.cfg.poll_interval_seconds));

		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		let mut tick = 0_u64;

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					// The in-flight tick always finishes; cancellation only
					// stops the next one from starting.
					if let Err(err) = self.run_tick().await {
						tracing::error!(error = %err, "Reindex poll tick failed.");
					}

					tick += 1;

					if tick % PURGE_EVERY_TICKS == 0 {
						self.purge_old_jobs().await;
					}
				},
			}
		}
	}

	pub async fn run_tick(&self) -> Result<()> {
		for job in self.jobs.list_runnable_jobs().await? {
			if let Err(err) = self.advance_job(&job).await {
				tracing::error!(job_id = %job.job_id, error = %err, "Reindex job failed.");
				self.jobs
					.mark_job_failed(job.job_id, &err.to_string(), OffsetDateTime::now_utc())
					.await?;
			}
		}

		Ok(())
	}

	async fn advance_job(&self, job: &ReindexJob) -> Result<()> {
		let now = OffsetDateTime::now_utc();

		if job.status == JobStatus::Queued {
			self.jobs.mark_job_started(job.job_id, now).await?;
		}

		let items = self.jobs.claim_pending_items(job.job_id, self.cfg.batch_size).await?;

		if items.is_empty() {
			self.jobs.mark_job_completed(job.job_id, OffsetDateTime::now_utc()).await?;
			tracing::info!(
				job_id = %job.job_id,
				processed = job.processed,
				failed = job.failed,
				"Reindex job completed."
			);

			return Ok(());
		}

		let mut processed = 0_u32;
		let mut failed = 0_u32;

		for item in items {
			match self.processor.process_user(&item.user_id, self.ttl, job.force).await {
				Ok(outcome) => {
					// An unchanged skip or a consent removal still counts as
					// a processed item.
					if outcome == Outcome::Skipped {
						tracing::debug!(
							job_id = %job.job_id,
							user_id = %item.user_id,
							"Reindex item unchanged."
						);
					}

					self.jobs
						.mark_item(job.job_id, &item.user_id, ItemStatus::Completed, None)
						.await?;

					processed += 1;
				},
				Err(err) => {
					self.jobs
						.mark_item(
							job.job_id,
							&item.user_id,
							ItemStatus::Failed,
							Some(&err.to_string()),
						)
						.await?;

					failed += 1;
				},
			}
		}

		self.jobs.add_progress(job.job_id, processed, failed).await?;

		Ok(())
	}

	async fn purge_old_jobs(&self) {
		let cutoff = OffsetDateTime::now_utc() - Duration::days(self.cfg.retention_days);

		match self.jobs.purge_older_than(cutoff).await {
			Ok(0) => {},
			Ok(purged) => tracing::info!(purged, "Old reindex jobs purged."),
			Err(err) => tracing::error!(error = %err, "Reindex retention purge failed."),
		}
	}
}
