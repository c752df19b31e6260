use sqlx::PgPool;

use crate::{BoxFuture, Error, QueryLogStore, Result, models::QueryLogEntry};

pub struct PgQueryLog {
	pub pool: PgPool,
}
impl PgQueryLog {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

impl QueryLogStore for PgQueryLog {
	fn record<'a>(&'a self, entry: &'a QueryLogEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let vector = serde_json::to_value(&entry.vector)
				.map_err(|err| Error::InvalidArgument(format!("Failed to encode vector: {err}")))?;
			let results = serde_json::to_value(&entry.results).map_err(|err| {
				Error::InvalidArgument(format!("Failed to encode results: {err}"))
			})?;

			sqlx::query(
				"\
INSERT INTO search_query_log (query, vector, result_count, duration_ms, results, created_at)
VALUES ($1, $2, $3, $4, $5, $6)",
			)
			.bind(entry.query.as_str())
			.bind(vector)
			.bind(entry.result_count as i32)
			.bind(entry.duration_ms as i64)
			.bind(results)
			.bind(entry.created_at)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}
}
