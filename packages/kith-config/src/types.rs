use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub directory: Directory,
	pub indexing: Indexing,
	pub reindex: Reindex,
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub image_analysis: ImageAnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_retry_base_delay_ms")]
	pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageAnalysisConfig {
	pub enabled: bool,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Directory {
	pub api_base: String,
	pub api_key: Option<String>,
	pub page_size: u32,
	pub timeout_ms: u64,
	pub consent: Consent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Consent {
	pub enforce: bool,
	pub timeout_ms: u64,
	/// "allow" proceeds as if consent was granted when the consent service
	/// is unavailable; "deny" fails the affected user instead.
	pub on_error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indexing {
	pub cycle_seconds: u64,
	pub available_ttl_seconds: i64,
	pub full_ttl_seconds: i64,
	pub full_index_enabled: bool,
	pub full_index_interval_seconds: i64,
	pub workers: u32,
	pub queue_depth: u32,
	pub min_embed_interval_ms: u64,
	pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reindex {
	pub poll_interval_seconds: u64,
	pub batch_size: u32,
	pub retention_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub default_limit: u32,
	#[serde(default = "default_fulltext_weight")]
	pub fulltext_weight: f32,
	#[serde(default = "default_vector_weight")]
	pub vector_weight: f32,
	pub query_log_enabled: bool,
	pub purge_interval_seconds: u64,
}

fn default_max_retries() -> u32 {
	3
}

fn default_retry_base_delay_ms() -> u64 {
	500
}

fn default_fulltext_weight() -> f32 {
	0.3
}

fn default_vector_weight() -> f32 {
	0.7
}
