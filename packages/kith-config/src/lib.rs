mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Consent, Directory, EmbeddingProviderConfig, ImageAnalysisConfig, Indexing, Postgres,
	Providers, Qdrant, Reindex, Search, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.image_analysis.enabled && cfg.providers.image_analysis.api_key.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "providers.image_analysis.api_key must be non-empty when enabled.".to_string(),
		});
	}
	if cfg.directory.page_size == 0 {
		return Err(Error::Validation {
			message: "directory.page_size must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.directory.consent.on_error.as_str(), "allow" | "deny") {
		return Err(Error::Validation {
			message: "directory.consent.on_error must be one of allow or deny.".to_string(),
		});
	}
	if cfg.directory.consent.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "directory.consent.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.cycle_seconds == 0 {
		return Err(Error::Validation {
			message: "indexing.cycle_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.available_ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "indexing.available_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.full_ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "indexing.full_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.full_ttl_seconds < cfg.indexing.available_ttl_seconds {
		return Err(Error::Validation {
			message:
				"indexing.full_ttl_seconds must not be shorter than indexing.available_ttl_seconds."
					.to_string(),
		});
	}
	if cfg.indexing.full_index_enabled && cfg.indexing.full_index_interval_seconds <= 0 {
		return Err(Error::Validation {
			message: "indexing.full_index_interval_seconds must be greater than zero when full indexing is enabled."
				.to_string(),
		});
	}
	if cfg.indexing.workers == 0 {
		return Err(Error::Validation {
			message: "indexing.workers must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.queue_depth == 0 {
		return Err(Error::Validation {
			message: "indexing.queue_depth must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.cleanup_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "indexing.cleanup_interval_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.reindex.poll_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "reindex.poll_interval_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.reindex.batch_size == 0 {
		return Err(Error::Validation {
			message: "reindex.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.reindex.retention_days <= 0 {
		return Err(Error::Validation {
			message: "reindex.retention_days must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("search.fulltext_weight", cfg.search.fulltext_weight),
		("search.vector_weight", cfg.search.vector_weight),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number."),
			});
		}
		if weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be zero or greater."),
			});
		}
	}

	if cfg.search.fulltext_weight + cfg.search.vector_weight <= 0.0 {
		return Err(Error::Validation {
			message: "search fusion weights must not both be zero.".to_string(),
		});
	}
	if cfg.search.purge_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "search.purge_interval_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.directory.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.directory.api_key = None;
	}

	cfg.directory.consent.on_error = cfg.directory.consent.on_error.trim().to_lowercase();
}
