pub const DENSE_VECTOR_NAME: &str = "dense";
pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";

use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, DeletePointsBuilder, Document, Filter, GetPointsBuilder,
		PointStruct, Query, QueryPointsBuilder, Range, UpsertPointsBuilder, Value, Vector,
		value::Kind,
	},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
	BoxFuture, EmbeddingStore, Error, Result,
	models::{CandidateFilter, SearchHit, UserEmbedding},
};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &kith_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Create the collection if it does not exist yet: one named dense vector
	/// and one server-side BM25 sparse vector.
	pub async fn ensure_collection(&self) -> Result<()> {
		use qdrant_client::qdrant::{
			CreateCollectionBuilder, Distance, Modifier, SparseVectorParamsBuilder,
			SparseVectorsConfigBuilder, VectorParamsBuilder, VectorsConfigBuilder,
		};

		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

		sparse_vectors_config.add_named_vector_params(
			BM25_VECTOR_NAME,
			SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone())
					.vectors_config(vectors_config)
					.sparse_vectors_config(sparse_vectors_config),
			)
			.await?;

		Ok(())
	}

	fn live_filter(filter: &CandidateFilter, now: OffsetDateTime) -> Filter {
		let mut must = vec![Condition::range(
			"expires_at_ts",
			Range { gt: Some(now.unix_timestamp() as f64), ..Default::default() },
		)];

		if let Some(ids) = &filter.ids {
			must.push(Condition::matches("user_id", ids.clone()));
		}

		let must_not = match &filter.exclude {
			Some(user_id) => vec![Condition::matches("user_id", user_id.clone())],
			None => Vec::new(),
		};

		Filter { must, must_not, should: Vec::new(), min_should: None }
	}

	fn hit_from_payload(payload: &HashMap<String, Value>, score: f32) -> Result<SearchHit> {
		Ok(SearchHit {
			user_id: payload_str(payload, "user_id")?,
			score,
			source_text: payload_str(payload, "source_text")?,
		})
	}

	async fn run_search(
		&self,
		query: Query,
		using: &str,
		filter: &CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> Result<Vec<SearchHit>> {
		// An explicit empty allow-list can match nobody.
		if matches!(&filter.ids, Some(ids) if ids.is_empty()) {
			return Ok(Vec::new());
		}

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(query)
			.using(using)
			.filter(Self::live_filter(filter, now))
			.limit(limit as u64)
			.with_payload(true);
		let response = self.client.query(search).await?;

		response
			.result
			.iter()
			.map(|point| Self::hit_from_payload(&point.payload, point.score))
			.collect()
	}
}

/// Stable point id for a user. One user owns exactly one point, so upserts
/// for the same user always land on the same id.
pub fn point_id_for(user_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes())
}

impl EmbeddingStore for QdrantStore {
	fn get<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserEmbedding>>> {
		Box::pin(async move {
			let response = self
				.client
				.get_points(
					GetPointsBuilder::new(
						self.collection.clone(),
						vec![point_id_for(user_id).to_string().into()],
					)
					.with_payload(true),
				)
				.await?;
			let Some(point) = response.result.into_iter().next() else {
				return Ok(None);
			};

			record_from_payload(&point.payload).map(Some)
		})
	}

	fn upsert<'a>(
		&'a self,
		record: &'a UserEmbedding,
		vector: &'a [f32],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if vector.len() != self.vector_dim as usize {
				return Err(Error::InvalidArgument(format!(
					"Embedding vector has {} dimensions, collection expects {}.",
					vector.len(),
					self.vector_dim
				)));
			}

			let mut payload = Payload::new();

			payload.insert("user_id", record.user_id.clone());
			payload.insert("source_text", record.source_text.clone());
			payload.insert("content_hash", record.content_hash.clone());
			payload.insert("provider", record.provider.clone());
			payload.insert("model", record.model.clone());
			payload.insert("created_at", format_timestamp(record.created_at)?);
			payload.insert("updated_at", format_timestamp(record.updated_at)?);
			payload.insert("expires_at", format_timestamp(record.expires_at)?);
			payload
				.insert("expires_at_ts", Value::from(record.expires_at.unix_timestamp() as f64));

			let mut vectors = HashMap::new();

			vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector.to_vec()));
			vectors.insert(
				BM25_VECTOR_NAME.to_string(),
				Vector::from(Document::new(record.source_text.clone(), BM25_MODEL)),
			);

			let point =
				PointStruct::new(point_id_for(&record.user_id).to_string(), vectors, payload);

			self.client
				.upsert_points(
					UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true),
				)
				.await?;

			Ok(())
		})
	}

	fn delete<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);
			let delete =
				DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true);

			self.client.delete_points(delete).await?;

			Ok(())
		})
	}

	fn vector_search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			self.run_search(
				Query::new_nearest(vector.to_vec()),
				DENSE_VECTOR_NAME,
				filter,
				limit,
				now,
			)
			.await
		})
	}

	fn text_search<'a>(
		&'a self,
		query: &'a str,
		filter: &'a CandidateFilter,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			self.run_search(
				Query::new_nearest(Document::new(query.to_string(), BM25_MODEL)),
				BM25_VECTOR_NAME,
				filter,
				limit,
				now,
			)
			.await
		})
	}

	fn count<'a>(
		&'a self,
		filter: &'a CandidateFilter,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			if matches!(&filter.ids, Some(ids) if ids.is_empty()) {
				return Ok(0);
			}

			let response = self
				.client
				.count(
					CountPointsBuilder::new(self.collection.clone())
						.filter(Self::live_filter(filter, now))
						.exact(true),
				)
				.await?;

			Ok(response.result.map(|result| result.count).unwrap_or(0))
		})
	}

	fn sweep_expired<'a>(&'a self, now: OffsetDateTime) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let expired = Filter::must([Condition::range(
				"expires_at_ts",
				Range { lte: Some(now.unix_timestamp() as f64), ..Default::default() },
			)]);
			let response = self
				.client
				.count(
					CountPointsBuilder::new(self.collection.clone())
						.filter(expired.clone())
						.exact(true),
				)
				.await?;
			let count = response.result.map(|result| result.count).unwrap_or(0);

			if count == 0 {
				return Ok(0);
			}

			self.client
				.delete_points(
					DeletePointsBuilder::new(self.collection.clone()).points(expired).wait(true),
				)
				.await?;

			Ok(count)
		})
	}
}

fn record_from_payload(payload: &HashMap<String, Value>) -> Result<UserEmbedding> {
	Ok(UserEmbedding {
		user_id: payload_str(payload, "user_id")?,
		source_text: payload_str(payload, "source_text")?,
		content_hash: payload_str(payload, "content_hash")?,
		provider: payload_str(payload, "provider")?,
		model: payload_str(payload, "model")?,
		created_at: payload_timestamp(payload, "created_at")?,
		updated_at: payload_timestamp(payload, "updated_at")?,
		expires_at: payload_timestamp(payload, "expires_at")?,
	})
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Result<String> {
	let value = payload.get(key).ok_or_else(|| missing(key))?;
	match &value.kind {
		Some(Kind::StringValue(text)) => Ok(text.clone()),
		_ => Err(missing(key)),
	}
}

fn payload_timestamp(payload: &HashMap<String, Value>, key: &str) -> Result<OffsetDateTime> {
	let raw = payload_str(payload, key)?;

	OffsetDateTime::parse(&raw, &Rfc3339)
		.map_err(|_| Error::Decode(format!("Payload field {key} is not a valid timestamp.")))
}

fn missing(key: &str) -> Error {
	Error::Decode(format!("Payload field {key} is missing or has the wrong type."))
}

fn format_timestamp(ts: OffsetDateTime) -> Result<String> {
	ts.format(&Rfc3339)
		.map_err(|_| Error::InvalidArgument("Failed to format timestamp.".to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn point_ids_are_deterministic() {
		assert_eq!(point_id_for("user-1"), point_id_for("user-1"));
		assert_ne!(point_id_for("user-1"), point_id_for("user-2"));
	}

	#[test]
	fn empty_id_list_matches_nobody() {
		let filter = CandidateFilter::for_ids(Vec::new());

		assert!(matches!(&filter.ids, Some(ids) if ids.is_empty()));
	}
}
