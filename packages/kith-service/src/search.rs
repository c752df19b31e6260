use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use kith_domain::{
	reasons::{self, VisualContext},
	text::{EMPTY_QUERY_SEED, normalize_query},
};
use kith_storage::models::{
	CandidateFilter, FusionWeights, QueryLogEntry, QueryLogResult, SearchHit,
};

use crate::{SearchService, ServiceError, ServiceResult};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
	Fulltext,
	Vector,
	#[default]
	Hybrid,
}

/// Which population the search may match against. Absent means the whole
/// indexed population.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
	/// The caller's friends only.
	Friends,
	/// Users currently available for discovery.
	Discovery,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub mode: SearchMode,
	#[serde(default)]
	pub limit: Option<u32>,
	/// Explicit allow-list; wins over `scope` outright.
	#[serde(default)]
	pub candidate_ids: Option<Vec<String>>,
	#[serde(default)]
	pub scope: Option<SearchScope>,
	/// Required for the `friends` scope.
	#[serde(default)]
	pub caller_id: Option<String>,
	#[serde(default)]
	pub exclude_user_id: Option<String>,
	#[serde(default)]
	pub include_visual_context: bool,
	#[serde(default)]
	pub fulltext_weight: Option<f32>,
	#[serde(default)]
	pub vector_weight: Option<f32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchItem {
	pub user_id: String,
	pub score: f32,
	pub match_reasons: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub visual_context: Option<VisualContext>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
	/// Live candidates inside the resolved scope, independent of `limit`.
	pub total_candidates: u64,
	pub mode: SearchMode,
	pub query: String,
}

impl SearchService {
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		let started = Instant::now();
		let normalized = normalize_query(&req.query);
		let limit = req.limit.unwrap_or(self.cfg.default_limit).max(1);
		let Some(filter) = self.resolve_filter(&req).await? else {
			// A provably empty scope returns nothing; "no filter" is reserved
			// for the unrestricted case.
			return Ok(SearchResponse {
				items: Vec::new(),
				total_candidates: 0,
				mode: req.mode,
				query: normalized,
			});
		};
		let now = OffsetDateTime::now_utc();
		let total_candidates = self.store.count(&filter, now).await?;
		let weights = FusionWeights {
			fulltext: req.fulltext_weight.unwrap_or(self.cfg.fulltext_weight),
			vector: req.vector_weight.unwrap_or(self.cfg.vector_weight),
		};
		let hits = match req.mode {
			SearchMode::Fulltext => {
				if normalized.is_empty() {
					return Err(ServiceError::InvalidRequest {
						message: "Full-text search needs a non-empty query.".to_string(),
					});
				}

				self.store.text_search(&normalized, &filter, limit, now).await?
			},
			SearchMode::Vector => {
				let seed =
					if normalized.is_empty() { EMPTY_QUERY_SEED } else { normalized.as_str() };
				let vector = self.embedder.embed(seed).await?;
				let hits = self.store.vector_search(&vector, &filter, limit, now).await?;

				if self.cfg.query_log_enabled {
					self.log_query(seed, vector, &hits, started);
				}

				hits
			},
			SearchMode::Hybrid => {
				// An empty hybrid query degenerates to the vector browse path,
				// without the vector-mode query log.
				if normalized.is_empty() {
					let vector = self.embedder.embed(EMPTY_QUERY_SEED).await?;

					self.store.vector_search(&vector, &filter, limit, now).await?
				} else {
					let vector = self.embedder.embed(&normalized).await?;

					self.store
						.hybrid_search(&normalized, &vector, weights, &filter, limit, now)
						.await?
				}
			},
		};
		let items = hits
			.into_iter()
			.map(|hit| {
				let match_reasons = reasons::match_reasons(&normalized, &hit.source_text, hit.score);
				let visual_context = req
					.include_visual_context
					.then(|| reasons::visual_context(&normalized, &hit.source_text));

				SearchItem { user_id: hit.user_id, score: hit.score, match_reasons, visual_context }
			})
			.collect();

		Ok(SearchResponse { items, total_candidates, mode: req.mode, query: normalized })
	}

	/// `None` means the scope resolved to a provably empty population.
	async fn resolve_filter(&self, req: &SearchRequest) -> ServiceResult<Option<CandidateFilter>> {
		let ids = if let Some(ids) = &req.candidate_ids {
			Some(ids.clone())
		} else {
			match req.scope {
				Some(SearchScope::Friends) => {
					let caller = req.caller_id.as_deref().ok_or_else(|| {
						ServiceError::InvalidRequest {
							message: "The friends scope needs a caller_id.".to_string(),
						}
					})?;

					Some(self.directory.get_user_friend_ids(caller).await?)
				},
				Some(SearchScope::Discovery) =>
					Some(self.directory.list_available_user_ids().await?),
				None => None,
			}
		};

		if let Some(ids) = &ids
			&& ids.is_empty()
		{
			return Ok(None);
		}

		Ok(Some(CandidateFilter { ids, exclude: req.exclude_user_id.clone() }))
	}

	/// Fire-and-forget: analytics never delay or fail the response.
	fn log_query(&self, query: &str, vector: Vec<f32>, hits: &[SearchHit], started: Instant) {
		let entry = QueryLogEntry {
			query: query.to_string(),
			vector,
			result_count: hits.len() as u32,
			duration_ms: started.elapsed().as_millis() as u64,
			results: hits
				.iter()
				.enumerate()
				.map(|(rank, hit)| QueryLogResult {
					user_id: hit.user_id.clone(),
					rank: (rank + 1) as u32,
					score: hit.score,
				})
				.collect(),
			created_at: OffsetDateTime::now_utc(),
		};
		let log = self.query_log.clone();

		tokio::spawn(async move {
			if let Err(err) = log.record(&entry).await {
				tracing::debug!(error = %err, "Query log write failed.");
			}
		});
	}
}
