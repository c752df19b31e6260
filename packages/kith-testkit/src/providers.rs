use std::{
	collections::HashMap,
	sync::atomic::{AtomicUsize, Ordering},
};

use kith_providers::{
	BoxFuture, ConsentClient, DirectoryClient, EmbeddingBackend, Error, ImageAnalysis,
	ImageAnalyzer, Profile, ProfileClient, Result,
};

/// `fail_all` makes only the full-population listing fail, so tests can
/// break one pipeline phase while the other keeps working.
#[derive(Default)]
pub struct StaticDirectoryClient {
	pub available: Vec<String>,
	pub all: Vec<String>,
	pub friends: HashMap<String, Vec<String>>,
	pub fail_all: bool,
}

impl DirectoryClient for StaticDirectoryClient {
	fn list_available_user_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		let ids = self.available.clone();

		Box::pin(async move { Ok(ids) })
	}

	fn list_all_user_ids<'a>(
		&'a self,
		offset: u32,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		let page = if self.fail_all {
			Err(Error::Transient("Full-population listing is down.".to_string()))
		} else {
			Ok(self.all.iter().skip(offset as usize).take(limit as usize).cloned().collect())
		};

		Box::pin(async move { page })
	}

	fn get_user_friend_ids<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		let friends = self.friends.get(user_id).cloned().unwrap_or_default();

		Box::pin(async move { Ok(friends) })
	}
}

#[derive(Default)]
pub struct StaticProfileClient {
	pub profiles: HashMap<String, Profile>,
}
impl StaticProfileClient {
	pub fn with(profiles: impl IntoIterator<Item = Profile>) -> Self {
		Self {
			profiles: profiles
				.into_iter()
				.map(|profile| (profile.user_id.clone(), profile))
				.collect(),
		}
	}
}

impl ProfileClient for StaticProfileClient {
	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Profile>> {
		let result = self
			.profiles
			.get(user_id)
			.cloned()
			.ok_or_else(|| Error::InvalidResponse(format!("No profile for user {user_id}.")));

		Box::pin(async move { result })
	}
}

/// Consent answers per user. Unknown users get `default_decision`; `fail`
/// makes every check report the consent service as unavailable.
#[derive(Default)]
pub struct StaticConsentClient {
	pub decisions: HashMap<String, bool>,
	pub default_decision: bool,
	pub fail: bool,
}
impl StaticConsentClient {
	pub fn allowing_all() -> Self {
		Self { default_decision: true, ..Self::default() }
	}

	pub fn denying(user_id: &str) -> Self {
		Self {
			decisions: HashMap::from([(user_id.to_string(), false)]),
			default_decision: true,
			fail: false,
		}
	}

	pub fn unavailable() -> Self {
		Self { fail: true, ..Self::default() }
	}
}

impl ConsentClient for StaticConsentClient {
	fn check_search_consent<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		let result = if self.fail {
			Err(Error::ConsentUnavailable("Consent service is down.".to_string()))
		} else {
			Ok(self.decisions.get(user_id).copied().unwrap_or(self.default_decision))
		};

		Box::pin(async move { result })
	}
}

/// Deterministic embedder: the vector is derived from a hash of the text, so
/// equal texts embed identically and similarity search stays meaningful.
pub struct CountingEmbedder {
	pub dimensions: usize,
	pub calls: AtomicUsize,
	pub fail: bool,
}
impl CountingEmbedder {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions, calls: AtomicUsize::new(0), fail: false }
	}

	pub fn failing(dimensions: usize) -> Self {
		Self { dimensions, calls: AtomicUsize::new(0), fail: true }
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl EmbeddingBackend for CountingEmbedder {
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let result = if self.fail {
			Err(Error::Transient("Embedding backend is down.".to_string()))
		} else {
			let digest = blake3::hash(text.as_bytes());
			let bytes = digest.as_bytes();
			let vector = (0..self.dimensions)
				.map(|i| bytes[i % bytes.len()] as f32 / 255.0)
				.collect();

			Ok(vector)
		};

		Box::pin(async move { result })
	}

	fn provider_name(&self) -> &str {
		"testkit"
	}

	fn model_name(&self) -> &str {
		"counting-embedder"
	}
}

#[derive(Default)]
pub struct StubImageAnalyzer {
	pub description: Option<String>,
	pub fail: bool,
}
impl StubImageAnalyzer {
	pub fn describing(description: &str) -> Self {
		Self { description: Some(description.to_string()), fail: false }
	}

	pub fn failing() -> Self {
		Self { description: None, fail: true }
	}
}

impl ImageAnalyzer for StubImageAnalyzer {
	fn analyze<'a>(
		&'a self,
		_user_id: &'a str,
		image_refs: &'a [String],
	) -> BoxFuture<'a, Result<ImageAnalysis>> {
		let result = if self.fail {
			Err(Error::Transient("Image analysis is down.".to_string()))
		} else {
			match (&self.description, image_refs.is_empty()) {
				(Some(description), false) => Ok(ImageAnalysis {
					combined_text: description.clone(),
					analyzed_count: image_refs.len() as u32,
				}),
				_ => Ok(ImageAnalysis::default()),
			}
		};

		Box::pin(async move { result })
	}
}
