pub mod db;
pub mod jobs;
pub mod models;
pub mod qdrant;
pub mod query_log;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

use std::collections::HashMap;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{
	CandidateFilter, FusionWeights, ItemStatus, QueryLogEntry, ReindexJob, ReindexJobItem,
	SearchHit, UserEmbedding,
};

/// How many candidates each leg of a hybrid search pulls before fusion,
/// as a multiple of the requested limit.
const HYBRID_CANDIDATE_FACTOR: u32 = 3;

/// The embedding store contract. Every read applies the liveness predicate
/// `expires_at > now`; expired records are invisible until swept.
pub trait EmbeddingStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserEmbedding>>>;

	fn upsert<'a>(
		&'a self,
		record: &'a UserEmbedding,
		vector: &'a [f32],
	) -> BoxFuture<'a, Result<()>>;

	fn delete<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<()>>;

	fn vector_search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>>;

	fn text_search<'a>(
		&'a self,
		query: &'a str,
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>>;

	fn count<'a>(&'a self, filter: &'a CandidateFilter, now: OffsetDateTime)
	-> BoxFuture<'a, Result<u64>>;

	fn sweep_expired<'a>(&'a self, now: OffsetDateTime) -> BoxFuture<'a, Result<u64>>;

	fn exists<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.get(user_id).await?.is_some()) })
	}

	/// Best-effort bulk delete; returns how many deletes succeeded.
	fn delete_many<'a>(&'a self, user_ids: &'a [String]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut deleted = 0;

			for user_id in user_ids {
				if self.delete(user_id).await.is_ok() {
					deleted += 1;
				}
			}

			Ok(deleted)
		})
	}

	/// Weighted reciprocal-rank fusion of the two search paths. The default
	/// runs both legs at a widened depth and fuses client-side, so the merge
	/// is deterministic and identical across backends.
	fn hybrid_search<'a>(
		&'a self,
		query: &'a str,
		vector: &'a [f32],
		weights: FusionWeights,
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			let depth = limit.saturating_mul(HYBRID_CANDIDATE_FACTOR).max(limit);
			let fulltext = self.text_search(query, filter, depth, now).await?;
			let semantic = self.vector_search(vector, filter, depth, now).await?;
			let mut texts: HashMap<String, String> = HashMap::new();

			for hit in fulltext.iter().chain(semantic.iter()) {
				texts.entry(hit.user_id.clone()).or_insert_with(|| hit.source_text.clone());
			}

			let fulltext_ids: Vec<String> = fulltext.iter().map(|hit| hit.user_id.clone()).collect();
			let semantic_ids: Vec<String> = semantic.iter().map(|hit| hit.user_id.clone()).collect();
			let fused = kith_domain::fusion::weighted_rrf(
				&fulltext_ids,
				&semantic_ids,
				weights.fulltext,
				weights.vector,
				limit as usize,
			);

			Ok(fused
				.into_iter()
				.map(|hit| SearchHit {
					source_text: texts.get(&hit.id).cloned().unwrap_or_default(),
					user_id: hit.id,
					score: hit.score,
				})
				.collect())
		})
	}
}

/// Durable bookkeeping for bulk reindex jobs.
pub trait ReindexStore
where
	Self: Send + Sync,
{
	/// Insert the job plus one `queued` item per user, atomically.
	fn create_job<'a>(
		&'a self,
		user_ids: &'a [String],
		force: bool,
	) -> BoxFuture<'a, Result<ReindexJob>>;

	fn get_job<'a>(&'a self, job_id: Uuid) -> BoxFuture<'a, Result<Option<ReindexJob>>>;

	/// Jobs in `queued` or `in_progress`, oldest first.
	fn list_runnable_jobs<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ReindexJob>>>;

	fn mark_job_started<'a>(
		&'a self,
		job_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn mark_job_completed<'a>(
		&'a self,
		job_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn mark_job_failed<'a>(
		&'a self,
		job_id: Uuid,
		message: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn claim_pending_items<'a>(
		&'a self,
		job_id: Uuid,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ReindexJobItem>>>;

	fn mark_item<'a>(
		&'a self,
		job_id: Uuid,
		user_id: &'a str,
		status: ItemStatus,
		error_message: Option<&'a str>,
	) -> BoxFuture<'a, Result<()>>;

	/// Single atomic addition to the job's running totals.
	fn add_progress<'a>(
		&'a self,
		job_id: Uuid,
		processed: u32,
		failed: u32,
	) -> BoxFuture<'a, Result<()>>;

	/// Drop terminal jobs (and their items) created before the cutoff.
	fn purge_older_than<'a>(&'a self, cutoff: OffsetDateTime) -> BoxFuture<'a, Result<u64>>;
}

pub trait QueryLogStore
where
	Self: Send + Sync,
{
	fn record<'a>(&'a self, entry: &'a QueryLogEntry) -> BoxFuture<'a, Result<()>>;
}
