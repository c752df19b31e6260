use std::{
	collections::HashSet,
	sync::Arc,
	time::{Duration as StdDuration, Instant},
};

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use kith_providers::{DirectoryClient, retry::with_backoff};
use kith_storage::EmbeddingStore;

use crate::{
	pool::{self, BatchOutcome},
	process::UserProcessor,
	stats::StatsHandle,
};

/// Drives the recurring indexing cycles: the available-user pass every tick
/// and the periodic full pass over the rest of the directory.
pub struct IndexingPipeline {
	processor: Arc<UserProcessor>,
	directory: Arc<dyn DirectoryClient>,
	store: Arc<dyn EmbeddingStore>,
	cfg: kith_config::Indexing,
	page_size: u32,
	stats: StatsHandle,
}

impl IndexingPipeline {
	pub fn new(
		processor: Arc<UserProcessor>,
		directory: Arc<dyn DirectoryClient>,
		store: Arc<dyn EmbeddingStore>,
		cfg: kith_config::Indexing,
		page_size: u32,
	) -> Self {
		let stats = StatsHandle::new();

		stats.update(|stats| stats.next_full_index_at = Some(OffsetDateTime::now_utc()));

		Self { processor, directory, store, cfg, page_size, stats }
	}

	pub fn stats(&self) -> StatsHandle {
		self.stats.clone()
	}

	/// One complete pass. Aborts early only when the available-user listing
	/// fails outright; per-user failures are tallied, not fatal, and a failed
	/// full phase still leaves the available phase's results on the books.
	pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<()> {
		let _guard = RunningGuard::arm(&self.stats);
		let started = Instant::now();
		let available = with_backoff(
			self.processor.cfg.max_retries,
			self.processor.cfg.retry_base_delay,
			|| self.directory.list_available_user_ids(),
		)
		.await?;
		let available_outcome = pool::run_batch(
			self.processor.clone(),
			available.clone(),
			Duration::seconds(self.cfg.available_ttl_seconds),
			self.cfg.workers,
			self.cfg.queue_depth,
			cancel,
		)
		.await;
		// A failed full phase aborts that phase only; the next due cycle
		// retries it because next_full_index_at was never advanced.
		let unavailable_outcome = match self.run_full_phase(&available, cancel).await {
			Ok(outcome) => outcome,
			Err(err) => {
				tracing::error!(error = %err, "Full-index phase failed.");

				BatchOutcome::default()
			},
		};
		let now = OffsetDateTime::now_utc();
		let duration_ms = started.elapsed().as_millis() as u64;

		self.stats.update(|stats| {
			stats.cycles_completed += 1;
			stats.last_run_at = Some(now);
			stats.last_run_duration_ms = Some(duration_ms);
			stats.next_run_at = Some(now + Duration::seconds(self.cfg.cycle_seconds as i64));
			stats.last_available = available_outcome.into_counters();
			stats.last_unavailable = unavailable_outcome.into_counters();
			stats.total_available.absorb(stats.last_available);
			stats.total_unavailable.absorb(stats.last_unavailable);
		});
		tracing::info!(
			available_indexed = available_outcome.indexed,
			available_skipped = available_outcome.skipped,
			unavailable_indexed = unavailable_outcome.indexed,
			failed = available_outcome.failed + unavailable_outcome.failed,
			duration_ms,
			"Indexing cycle finished."
		);

		Ok(())
	}

	/// Users not currently available still get indexed, on a slower cadence
	/// and with the longer TTL so they outlive their absence.
	async fn run_full_phase(
		&self,
		available: &[String],
		cancel: &CancellationToken,
	) -> Result<BatchOutcome> {
		if !self.cfg.full_index_enabled {
			return Ok(BatchOutcome::default());
		}

		let now = OffsetDateTime::now_utc();
		let due = self
			.stats
			.snapshot()
			.next_full_index_at
			.is_none_or(|next| now >= next);

		if !due {
			return Ok(BatchOutcome::default());
		}

		let available_set: HashSet<&str> = available.iter().map(String::as_str).collect();
		let mut remainder = Vec::new();
		let mut offset = 0_u32;

		loop {
			let page = with_backoff(
				self.processor.cfg.max_retries,
				self.processor.cfg.retry_base_delay,
				|| self.directory.list_all_user_ids(offset, self.page_size),
			)
			.await?;
			let page_len = page.len() as u32;

			remainder.extend(page.into_iter().filter(|id| !available_set.contains(id.as_str())));

			if page_len < self.page_size {
				break;
			}

			offset += page_len;
		}

		let outcome = pool::run_batch(
			self.processor.clone(),
			remainder,
			Duration::seconds(self.cfg.full_ttl_seconds),
			self.cfg.workers,
			self.cfg.queue_depth,
			cancel,
		)
		.await;

		self.stats.update(|stats| {
			stats.next_full_index_at =
				Some(now + Duration::seconds(self.cfg.full_index_interval_seconds));
		});

		Ok(outcome)
	}

	/// Run immediately, then on a fixed cadence until cancelled.
	pub async fn start(self: Arc<Self>, cancel: CancellationToken) {
		let mut ticker =
			tokio::time::interval(StdDuration::from_secs(self.cfg.cycle_seconds));

		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					if let Err(err) = self.run_cycle(&cancel).await {
						tracing::error!(error = %err, "Indexing cycle failed.");
					}
				},
			}
		}
	}

	/// Periodically drops expired records so they stop occupying the store.
	pub async fn start_ttl_cleanup(self: Arc<Self>, cancel: CancellationToken) {
		let mut ticker =
			tokio::time::interval(StdDuration::from_secs(self.cfg.cleanup_interval_seconds));

		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					match self.store.sweep_expired(OffsetDateTime::now_utc()).await {
						Ok(0) => {},
						Ok(swept) => tracing::info!(swept, "Expired embeddings removed."),
						Err(err) => tracing::error!(error = %err, "TTL cleanup failed."),
					}
				},
			}
		}
	}
}

/// Keeps the `running` flag honest on every exit path, including errors.
struct RunningGuard {
	stats: StatsHandle,
}
impl RunningGuard {
	fn arm(stats: &StatsHandle) -> Self {
		stats.update(|stats| stats.running = true);

		Self { stats: stats.clone() }
	}
}
impl Drop for RunningGuard {
	fn drop(&mut self) {
		self.stats.update(|stats| stats.running = false);
	}
}
