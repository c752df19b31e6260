use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use time::OffsetDateTime;
use uuid::Uuid;

use kith_storage::{
	BoxFuture, EmbeddingStore, Error, QueryLogStore, ReindexStore, Result,
	models::{
		CandidateFilter, ItemStatus, JobStatus, QueryLogEntry, ReindexJob, ReindexJobItem,
		SearchHit, UserEmbedding,
	},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[derive(Default)]
pub struct MemoryEmbeddingStore {
	records: Mutex<HashMap<String, (UserEmbedding, Vec<f32>)>>,
}
impl MemoryEmbeddingStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		lock(&self.records).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn stored_vector(&self, user_id: &str) -> Option<Vec<f32>> {
		lock(&self.records).get(user_id).map(|(_, vector)| vector.clone())
	}

	fn live_candidates(
		&self,
		filter: &CandidateFilter,
		now: OffsetDateTime,
	) -> Vec<(UserEmbedding, Vec<f32>)> {
		lock(&self.records)
			.values()
			.filter(|(record, _)| !record.is_expired(now))
			.filter(|(record, _)| match &filter.ids {
				Some(ids) => ids.iter().any(|id| id == &record.user_id),
				None => true,
			})
			.filter(|(record, _)| filter.exclude.as_deref() != Some(record.user_id.as_str()))
			.cloned()
			.collect()
	}
}

impl EmbeddingStore for MemoryEmbeddingStore {
	fn get<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserEmbedding>>> {
		let record = lock(&self.records).get(user_id).map(|(record, _)| record.clone());

		Box::pin(async move { Ok(record) })
	}

	fn upsert<'a>(
		&'a self,
		record: &'a UserEmbedding,
		vector: &'a [f32],
	) -> BoxFuture<'a, Result<()>> {
		lock(&self.records)
			.insert(record.user_id.clone(), (record.clone(), vector.to_vec()));

		Box::pin(async move { Ok(()) })
	}

	fn delete<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<()>> {
		lock(&self.records).remove(user_id);

		Box::pin(async move { Ok(()) })
	}

	fn vector_search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		let mut hits: Vec<SearchHit> = self
			.live_candidates(filter, now)
			.into_iter()
			.map(|(record, stored)| SearchHit {
				user_id: record.user_id,
				score: cosine(vector, &stored),
				source_text: record.source_text,
			})
			.collect();

		hits.sort_by(|a, b| {
			b.score.total_cmp(&a.score).then_with(|| a.user_id.cmp(&b.user_id))
		});
		hits.truncate(limit as usize);

		Box::pin(async move { Ok(hits) })
	}

	fn text_search<'a>(
		&'a self,
		query: &'a str,
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		let terms = kith_domain::text::query_terms(query);
		let mut hits: Vec<SearchHit> = self
			.live_candidates(filter, now)
			.into_iter()
			.filter_map(|(record, _)| {
				let haystack = record.source_text.to_lowercase();
				let matched = terms.iter().filter(|term| haystack.contains(*term)).count();

				(matched > 0).then(|| SearchHit {
					user_id: record.user_id,
					score: matched as f32,
					source_text: record.source_text,
				})
			})
			.collect();

		hits.sort_by(|a, b| {
			b.score.total_cmp(&a.score).then_with(|| a.user_id.cmp(&b.user_id))
		});
		hits.truncate(limit as usize);

		Box::pin(async move { Ok(hits) })
	}

	fn count<'a>(
		&'a self,
		filter: &'a CandidateFilter,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>> {
		let count = self.live_candidates(filter, now).len() as u64;

		Box::pin(async move { Ok(count) })
	}

	fn sweep_expired<'a>(&'a self, now: OffsetDateTime) -> BoxFuture<'a, Result<u64>> {
		let mut records = lock(&self.records);
		let before = records.len();

		records.retain(|_, (record, _)| !record.is_expired(now));

		let swept = (before - records.len()) as u64;

		Box::pin(async move { Ok(swept) })
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() {
		return 0.0;
	}

	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

#[derive(Default)]
struct ReindexState {
	jobs: HashMap<Uuid, ReindexJob>,
	items: HashMap<Uuid, Vec<ReindexJobItem>>,
}

#[derive(Default)]
pub struct MemoryReindexStore {
	state: Mutex<ReindexState>,
}
impl MemoryReindexStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl ReindexStore for MemoryReindexStore {
	fn create_job<'a>(
		&'a self,
		user_ids: &'a [String],
		force: bool,
	) -> BoxFuture<'a, Result<ReindexJob>> {
		Box::pin(async move {
			if user_ids.is_empty() {
				return Err(Error::InvalidArgument(
					"A reindex job needs at least one user.".to_string(),
				));
			}

			let job_id = Uuid::new_v4();
			let now = OffsetDateTime::now_utc();
			let mut seen = std::collections::HashSet::new();
			let items: Vec<ReindexJobItem> = user_ids
				.iter()
				.filter(|id| seen.insert(id.as_str()))
				.map(|user_id| ReindexJobItem {
					job_id,
					user_id: user_id.clone(),
					status: ItemStatus::Queued,
					error_message: None,
				})
				.collect();
			let job = ReindexJob {
				job_id,
				force,
				status: JobStatus::Queued,
				total: items.len() as u32,
				processed: 0,
				failed: 0,
				created_at: now,
				started_at: None,
				completed_at: None,
				error_message: None,
			};
			let mut state = lock(&self.state);

			state.jobs.insert(job_id, job.clone());
			state.items.insert(job_id, items);

			Ok(job)
		})
	}

	fn get_job<'a>(&'a self, job_id: Uuid) -> BoxFuture<'a, Result<Option<ReindexJob>>> {
		let job = lock(&self.state).jobs.get(&job_id).cloned();

		Box::pin(async move { Ok(job) })
	}

	fn list_runnable_jobs<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ReindexJob>>> {
		let mut jobs: Vec<ReindexJob> = lock(&self.state)
			.jobs
			.values()
			.filter(|job| !job.status.is_terminal())
			.cloned()
			.collect();

		jobs.sort_by_key(|job| job.created_at);

		Box::pin(async move { Ok(jobs) })
	}

	fn mark_job_started<'a>(
		&'a self,
		job_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		if let Some(job) = lock(&self.state).jobs.get_mut(&job_id) {
			job.status = JobStatus::InProgress;
			job.started_at.get_or_insert(now);
		}

		Box::pin(async move { Ok(()) })
	}

	fn mark_job_completed<'a>(
		&'a self,
		job_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		if let Some(job) = lock(&self.state).jobs.get_mut(&job_id) {
			job.status = JobStatus::Completed;
			job.completed_at = Some(now);
		}

		Box::pin(async move { Ok(()) })
	}

	fn mark_job_failed<'a>(
		&'a self,
		job_id: Uuid,
		message: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		if let Some(job) = lock(&self.state).jobs.get_mut(&job_id) {
			job.status = JobStatus::Failed;
			job.completed_at = Some(now);
			job.error_message = Some(message.to_string());
		}

		Box::pin(async move { Ok(()) })
	}

	fn claim_pending_items<'a>(
		&'a self,
		job_id: Uuid,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ReindexJobItem>>> {
		let mut items: Vec<ReindexJobItem> = lock(&self.state)
			.items
			.get(&job_id)
			.map(|items| {
				items
					.iter()
					.filter(|item| item.status == ItemStatus::Queued)
					.cloned()
					.collect()
			})
			.unwrap_or_default();

		items.sort_by(|a, b| a.user_id.cmp(&b.user_id));
		items.truncate(limit as usize);

		Box::pin(async move { Ok(items) })
	}

	fn mark_item<'a>(
		&'a self,
		job_id: Uuid,
		user_id: &'a str,
		status: ItemStatus,
		error_message: Option<&'a str>,
	) -> BoxFuture<'a, Result<()>> {
		if let Some(items) = lock(&self.state).items.get_mut(&job_id)
			&& let Some(item) = items.iter_mut().find(|item| item.user_id == user_id)
		{
			item.status = status;
			item.error_message = error_message.map(str::to_string);
		}

		Box::pin(async move { Ok(()) })
	}

	fn add_progress<'a>(
		&'a self,
		job_id: Uuid,
		processed: u32,
		failed: u32,
	) -> BoxFuture<'a, Result<()>> {
		if let Some(job) = lock(&self.state).jobs.get_mut(&job_id) {
			job.processed += processed;
			job.failed += failed;
		}

		Box::pin(async move { Ok(()) })
	}

	fn purge_older_than<'a>(&'a self, cutoff: OffsetDateTime) -> BoxFuture<'a, Result<u64>> {
		let mut state = lock(&self.state);
		let doomed: Vec<Uuid> = state
			.jobs
			.values()
			.filter(|job| job.status.is_terminal() && job.created_at < cutoff)
			.map(|job| job.job_id)
			.collect();

		for job_id in &doomed {
			state.jobs.remove(job_id);
			state.items.remove(job_id);
		}

		let purged = doomed.len() as u64;

		Box::pin(async move { Ok(purged) })
	}
}

#[derive(Default)]
pub struct MemoryQueryLog {
	entries: Mutex<Vec<QueryLogEntry>>,
}
impl MemoryQueryLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> Vec<QueryLogEntry> {
		lock(&self.entries).clone()
	}
}

impl QueryLogStore for MemoryQueryLog {
	fn record<'a>(&'a self, entry: &'a QueryLogEntry) -> BoxFuture<'a, Result<()>> {
		lock(&self.entries).push(entry.clone());

		Box::pin(async move { Ok(()) })
	}
}
