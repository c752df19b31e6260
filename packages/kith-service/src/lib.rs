pub mod admin;
pub mod search;

mod error;

pub use admin::ReindexTarget;
pub use error::{ServiceError, ServiceResult};
pub use search::{SearchItem, SearchMode, SearchRequest, SearchResponse, SearchScope};

use std::sync::Arc;

use kith_indexer::UserProcessor;
use kith_providers::{DirectoryClient, EmbeddingBackend};
use kith_storage::{EmbeddingStore, QueryLogStore, ReindexStore};

/// The query-side facade plus the maintenance operations an operator surface
/// would expose. Owns no background work of its own except the purge loop.
pub struct SearchService {
	pub cfg: kith_config::Search,
	pub store: Arc<dyn EmbeddingStore>,
	pub directory: Arc<dyn DirectoryClient>,
	pub embedder: Arc<dyn EmbeddingBackend>,
	pub query_log: Arc<dyn QueryLogStore>,
	pub jobs: Arc<dyn ReindexStore>,
	pub processor: Arc<UserProcessor>,
	/// Directory page size for resolving whole-population reindex targets.
	pub page_size: u32,
	/// TTL applied by single-user refreshes and reindex upserts.
	pub refresh_ttl_seconds: i64,
}
