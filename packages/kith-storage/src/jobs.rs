use std::collections::HashSet;

use sqlx::{PgPool, Row, postgres::PgRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture, Error, ReindexStore, Result,
	models::{ItemStatus, JobStatus, ReindexJob, ReindexJobItem},
};

/// Postgres limits a statement to 65535 bind parameters; chunked inserts
/// keep item batches comfortably under that.
const ITEM_INSERT_CHUNK: usize = 500;

const JOB_COLUMNS: &str = "\
job_id, force_reembed, status, total, processed, failed, created_at, started_at, completed_at, \
error_message";

pub struct PgReindexStore {
	pub pool: PgPool,
}
impl PgReindexStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

impl ReindexStore for PgReindexStore {
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

			let mut seen = HashSet::new();
			let user_ids: Vec<&String> =
				user_ids.iter().filter(|id| seen.insert(id.as_str())).collect();
			let job_id = Uuid::new_v4();
			let now = OffsetDateTime::now_utc();
			let total = user_ids.len() as i32;
			let mut tx = self.pool.begin().await?;

			sqlx::query(
				"\
INSERT INTO reindex_jobs (job_id, force_reembed, status, total, processed, failed, created_at)
VALUES ($1, $2, 'queued', $3, 0, 0, $4)",
			)
			.bind(job_id)
			.bind(force)
			.bind(total)
			.bind(now)
			.execute(&mut *tx)
			.await?;

			for chunk in user_ids.chunks(ITEM_INSERT_CHUNK) {
				let mut builder = sqlx::QueryBuilder::new(
					"INSERT INTO reindex_job_items (job_id, user_id, status) ",
				);

				builder.push_values(chunk, |mut row, user_id| {
					row.push_bind(job_id).push_bind(user_id.as_str()).push_bind("queued");
				});
				builder.build().execute(&mut *tx).await?;
			}

			tx.commit().await?;

			Ok(ReindexJob {
				job_id,
				force,
				status: JobStatus::Queued,
				total: total as u32,
				processed: 0,
				failed: 0,
				created_at: now,
				started_at: None,
				completed_at: None,
				error_message: None,
			})
		})
	}

	fn get_job<'a>(&'a self, job_id: Uuid) -> BoxFuture<'a, Result<Option<ReindexJob>>> {
		Box::pin(async move {
			let row = sqlx::query(&format!(
				"SELECT {JOB_COLUMNS} FROM reindex_jobs WHERE job_id = $1 LIMIT 1"
			))
			.bind(job_id)
			.fetch_optional(&self.pool)
			.await?;

			row.map(|row| job_from_row(&row)).transpose()
		})
	}

	fn list_runnable_jobs<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ReindexJob>>> {
		Box::pin(async move {
			let rows = sqlx::query(&format!(
				"\
SELECT {JOB_COLUMNS}
FROM reindex_jobs
WHERE status IN ('queued', 'in_progress')
ORDER BY created_at ASC"
			))
			.fetch_all(&self.pool)
			.await?;

			rows.iter().map(job_from_row).collect()
		})
	}

	fn mark_job_started<'a>(
		&'a self,
		job_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"\
UPDATE reindex_jobs
SET status = 'in_progress', started_at = COALESCE(started_at, $1)
WHERE job_id = $2",
			)
			.bind(now)
			.bind(job_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn mark_job_completed<'a>(
		&'a self,
		job_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"UPDATE reindex_jobs SET status = 'completed', completed_at = $1 WHERE job_id = $2",
			)
			.bind(now)
			.bind(job_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn mark_job_failed<'a>(
		&'a self,
		job_id: Uuid,
		message: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"\
UPDATE reindex_jobs
SET status = 'failed', completed_at = $1, error_message = $2
WHERE job_id = $3",
			)
			.bind(now)
			.bind(message)
			.bind(job_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn claim_pending_items<'a>(
		&'a self,
		job_id: Uuid,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ReindexJobItem>>> {
		Box::pin(async move {
			let rows = sqlx::query(
				"\
SELECT job_id, user_id, status, error_message
FROM reindex_job_items
WHERE job_id = $1 AND status = 'queued'
ORDER BY user_id ASC
LIMIT $2",
			)
			.bind(job_id)
			.bind(limit as i64)
			.fetch_all(&self.pool)
			.await?;

			rows.iter().map(item_from_row).collect()
		})
	}

	fn mark_item<'a>(
		&'a self,
		job_id: Uuid,
		user_id: &'a str,
		status: ItemStatus,
		error_message: Option<&'a str>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"\
UPDATE reindex_job_items
SET status = $1, error_message = $2
WHERE job_id = $3 AND user_id = $4",
			)
			.bind(status.as_str())
			.bind(error_message)
			.bind(job_id)
			.bind(user_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn add_progress<'a>(
		&'a self,
		job_id: Uuid,
		processed: u32,
		failed: u32,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"\
UPDATE reindex_jobs
SET processed = processed + $1, failed = failed + $2
WHERE job_id = $3",
			)
			.bind(processed as i32)
			.bind(failed as i32)
			.bind(job_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn purge_older_than<'a>(&'a self, cutoff: OffsetDateTime) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			// Items go with their job via ON DELETE CASCADE.
			let result = sqlx::query(
				"\
DELETE FROM reindex_jobs
WHERE status IN ('completed', 'failed') AND created_at < $1",
			)
			.bind(cutoff)
			.execute(&self.pool)
			.await?;

			Ok(result.rows_affected())
		})
	}
}

fn job_from_row(row: &PgRow) -> Result<ReindexJob> {
	Ok(ReindexJob {
		job_id: row.try_get("job_id")?,
		force: row.try_get("force_reembed")?,
		status: parse_status(row.try_get("status")?)?,
		total: row.try_get::<i32, _>("total")? as u32,
		processed: row.try_get::<i32, _>("processed")? as u32,
		failed: row.try_get::<i32, _>("failed")? as u32,
		created_at: row.try_get("created_at")?,
		started_at: row.try_get("started_at")?,
		completed_at: row.try_get("completed_at")?,
		error_message: row.try_get("error_message")?,
	})
}

fn item_from_row(row: &PgRow) -> Result<ReindexJobItem> {
	Ok(ReindexJobItem {
		job_id: row.try_get("job_id")?,
		user_id: row.try_get("user_id")?,
		status: row.try_get::<String, _>("status")?.parse().map_err(Error::Decode)?,
		error_message: row.try_get("error_message")?,
	})
}

fn parse_status(raw: String) -> Result<JobStatus> {
	raw.parse().map_err(Error::Decode)
}
