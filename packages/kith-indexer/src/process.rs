use std::{sync::Arc, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use time::{Duration, OffsetDateTime};

use kith_domain::{consent::ConsentErrorPolicy, hash::content_hash, text::build_source_text};
use kith_providers::{
	ConsentClient, EmbeddingBackend, ImageAnalyzer, Profile, ProfileClient, retry::with_backoff,
};
use kith_storage::{EmbeddingStore, models::UserEmbedding};

use crate::limiter::RateLimiter;

/// What happened to one user during an indexing pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
	/// A fresh embedding was written.
	Indexed,
	/// The profile text was unchanged; no embedding call was made.
	Skipped,
	/// Consent was denied; any stored record was deleted.
	Removed,
}

#[derive(Clone)]
pub struct ProcessorConfig {
	pub consent_enforced: bool,
	pub consent_timeout: StdDuration,
	pub consent_on_error: ConsentErrorPolicy,
	pub image_analysis_enabled: bool,
	pub max_retries: u32,
	pub retry_base_delay: StdDuration,
}
impl ProcessorConfig {
	pub fn from_config(cfg: &kith_config::Config) -> Result<Self> {
		let consent_on_error = cfg
			.directory
			.consent
			.on_error
			.parse::<ConsentErrorPolicy>()
			.map_err(|message| eyre::eyre!(message))?;

		Ok(Self {
			consent_enforced: cfg.directory.consent.enforce,
			consent_timeout: StdDuration::from_millis(cfg.directory.consent.timeout_ms),
			consent_on_error,
			image_analysis_enabled: cfg.providers.image_analysis.enabled,
			max_retries: cfg.providers.embedding.max_retries,
			retry_base_delay: StdDuration::from_millis(cfg.providers.embedding.retry_base_delay_ms),
		})
	}
}

/// Runs the full fetch -> consent -> text -> embed -> upsert sequence for a
/// single user. Shared by the cycle worker pool and the reindex poller.
pub struct UserProcessor {
	pub store: Arc<dyn EmbeddingStore>,
	pub profiles: Arc<dyn ProfileClient>,
	pub consent: Arc<dyn ConsentClient>,
	pub embedder: Arc<dyn EmbeddingBackend>,
	pub images: Arc<dyn ImageAnalyzer>,
	pub limiter: Arc<RateLimiter>,
	pub cfg: ProcessorConfig,
}

impl UserProcessor {
	/// `force` bypasses the unchanged-hash skip; reindex jobs use it, the
	/// regular cycle never does.
	pub async fn process_user(&self, user_id: &str, ttl: Duration, force: bool) -> Result<Outcome> {
		let profile = with_backoff(self.cfg.max_retries, self.cfg.retry_base_delay, || {
			self.profiles.get_profile(user_id)
		})
		.await?;

		if self.cfg.consent_enforced && !self.check_consent(user_id).await? {
			self.store.delete(user_id).await?;

			return Ok(Outcome::Removed);
		}

		let image_description = self.describe_images(&profile).await;
		let parts = profile.text_parts();
		let fields: Vec<&str> = parts.iter().map(String::as_str).collect();
		let source_text = build_source_text(&fields, image_description.as_deref());
		let hash = content_hash(&source_text);
		let now = OffsetDateTime::now_utc();
		let existing = self.store.get(user_id).await?;

		if !force
			&& let Some(record) = &existing
			&& record.content_hash == hash
			&& !record.is_expired(now)
		{
			return Ok(Outcome::Skipped);
		}

		self.limiter.acquire().await;

		let vector = with_backoff(self.cfg.max_retries, self.cfg.retry_base_delay, || {
			self.embedder.embed(&source_text)
		})
		.await?;
		let record = UserEmbedding {
			user_id: user_id.to_string(),
			source_text,
			content_hash: hash,
			provider: self.embedder.provider_name().to_string(),
			model: self.embedder.model_name().to_string(),
			created_at: existing.as_ref().map(|record| record.created_at).unwrap_or(now),
			updated_at: now,
			expires_at: now + ttl,
		};

		self.store.upsert(&record, &vector).await?;

		Ok(Outcome::Indexed)
	}

	/// `Ok(false)` is an explicit denial. Consent-service failures resolve
	/// through the configured policy instead of surfacing directly.
	async fn check_consent(&self, user_id: &str) -> Result<bool> {
		let check = self.consent.check_search_consent(user_id);
		let failure = match tokio::time::timeout(self.cfg.consent_timeout, check).await {
			Ok(Ok(decision)) => return Ok(decision),
			Ok(Err(err)) => err.to_string(),
			Err(_) => "Consent check timed out.".to_string(),
		};

		match self.cfg.consent_on_error {
			ConsentErrorPolicy::AllowOnError => {
				tracing::warn!(
					user_id,
					error = %failure,
					"Consent service unavailable; proceeding by policy."
				);

				Ok(true)
			},
			ConsentErrorPolicy::DenyOnError =>
				Err(eyre::eyre!("Consent unavailable for user {user_id}: {failure}")),
		}
	}

	/// Image analysis is additive; any failure degrades to text-only.
	async fn describe_images(&self, profile: &Profile) -> Option<String> {
		if !self.cfg.image_analysis_enabled || profile.image_refs.is_empty() {
			return None;
		}

		match self.images.analyze(&profile.user_id, &profile.image_refs).await {
			Ok(analysis) if analysis.analyzed_count > 0 => Some(analysis.combined_text),
			Ok(_) => None,
			Err(err) => {
				tracing::warn!(
					user_id = %profile.user_id,
					error = %err,
					"Image analysis failed; indexing text only."
				);

				None
			},
		}
	}
}
