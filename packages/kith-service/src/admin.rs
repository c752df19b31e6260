use std::{sync::Arc, time::Duration as StdDuration};

use time::{Duration, OffsetDateTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use kith_indexer::Outcome;
use kith_providers::retry::with_backoff;
use kith_storage::models::ReindexJob;

use crate::{SearchService, ServiceError, ServiceResult};

/// Who a bulk reindex covers.
#[derive(Clone, Debug)]
pub enum ReindexTarget {
	/// Every user the directory knows about.
	All,
	Users(Vec<String>),
}

impl SearchService {
	pub async fn purge_expired(&self) -> ServiceResult<u64> {
		Ok(self.store.sweep_expired(OffsetDateTime::now_utc()).await?)
	}

	/// Best-effort per id; returns how many records went away.
	pub async fn purge_for_users(&self, user_ids: &[String]) -> ServiceResult<u64> {
		Ok(self.store.delete_many(user_ids).await?)
	}

	pub async fn start_purge_loop(self: Arc<Self>, cancel: CancellationToken) {
		let mut ticker =
			tokio::time::interval(StdDuration::from_secs(self.cfg.purge_interval_seconds));

		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					match self.purge_expired().await {
						Ok(0) => {},
						Ok(purged) => tracing::info!(purged, "Expired embeddings purged."),
						Err(err) => tracing::error!(error = %err, "Expired-embedding purge failed."),
					}
				},
			}
		}
	}

	/// Rebuild one user's record immediately, bypassing the unchanged-hash
	/// skip. Consent still applies and may delete instead.
	pub async fn update_user_embedding(&self, user_id: &str) -> ServiceResult<Outcome> {
		self.processor
			.process_user(user_id, Duration::seconds(self.refresh_ttl_seconds), true)
			.await
			.map_err(ServiceError::from)
	}

	pub async fn delete_user_embedding(&self, user_id: &str) -> ServiceResult<()> {
		Ok(self.store.delete(user_id).await?)
	}

	pub async fn has_embedding(&self, user_id: &str) -> ServiceResult<bool> {
		Ok(self.store.exists(user_id).await?)
	}

	pub async fn create_reindex_job(
		&self,
		target: ReindexTarget,
		force: bool,
	) -> ServiceResult<ReindexJob> {
		let user_ids = match target {
			ReindexTarget::Users(ids) => ids,
			ReindexTarget::All => self.resolve_all_user_ids().await?,
		};

		if user_ids.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Reindex target resolved to zero users.".to_string(),
			});
		}

		Ok(self.jobs.create_job(&user_ids, force).await?)
	}

	pub async fn reindex_status(&self, job_id: Uuid) -> ServiceResult<Option<ReindexJob>> {
		Ok(self.jobs.get_job(job_id).await?)
	}

	async fn resolve_all_user_ids(&self) -> ServiceResult<Vec<String>> {
		let mut user_ids = Vec::new();
		let mut offset = 0_u32;

		loop {
			let page = with_backoff(
				self.processor.cfg.max_retries,
				self.processor.cfg.retry_base_delay,
				|| self.directory.list_all_user_ids(offset, self.page_size),
			)
			.await?;
			let page_len = page.len() as u32;

			user_ids.extend(page);

			if page_len < self.page_size {
				break;
			}

			offset += page_len;
		}

		Ok(user_ids)
	}
}
