pub mod consent;
pub mod directory;
pub mod embedding;
pub mod image;
pub mod profile;
pub mod retry;

mod error;

pub use consent::HttpConsentClient;
pub use directory::HttpDirectoryClient;
pub use embedding::HttpEmbeddingBackend;
pub use error::{Error, Result};
pub use image::{HttpImageAnalyzer, ImageAnalysis};
pub use profile::{HttpProfileClient, Profile};

use std::{future::Future, pin::Pin};

use reqwest::header::{AUTHORIZATION, HeaderMap};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Presence, population, and social-graph lookups against the directory
/// service.
pub trait DirectoryClient
where
	Self: Send + Sync,
{
	fn list_available_user_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>>;

	fn list_all_user_ids<'a>(&'a self, offset: u32, limit: u32)
	-> BoxFuture<'a, Result<Vec<String>>>;

	fn get_user_friend_ids<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;
}

pub trait ProfileClient
where
	Self: Send + Sync,
{
	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Profile>>;
}

/// Search-indexing consent decisions. A `false` answer is a decision, not a
/// failure; failures surface as [`Error::ConsentUnavailable`].
pub trait ConsentClient
where
	Self: Send + Sync,
{
	fn check_search_consent<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>>;
}

/// The embedding backend. Also the single source of truth for the
/// `provider`/`model` identity stored on every record.
pub trait EmbeddingBackend
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;

	fn provider_name(&self) -> &str;

	fn model_name(&self) -> &str;
}

pub trait ImageAnalyzer
where
	Self: Send + Sync,
{
	fn analyze<'a>(
		&'a self,
		user_id: &'a str,
		image_refs: &'a [String],
	) -> BoxFuture<'a, Result<ImageAnalysis>>;
}

pub(crate) fn bearer_headers(api_key: Option<&str>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(key) = api_key {
		headers.insert(
			AUTHORIZATION,
			format!("Bearer {key}")
				.parse()
				.map_err(|_| Error::InvalidResponse("API key is not a valid header value.".to_string()))?,
		);
	}

	Ok(headers)
}
