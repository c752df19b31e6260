use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{BoxFuture, ProfileClient, Result};

/// The indexable surface of a user profile.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Profile {
	pub user_id: String,
	#[serde(default)]
	pub display_name: String,
	#[serde(default)]
	pub headline: String,
	#[serde(default)]
	pub bio: String,
	#[serde(default)]
	pub interests: Vec<String>,
	#[serde(default)]
	pub location: String,
	#[serde(default)]
	pub image_refs: Vec<String>,
}

impl Profile {
	/// The structured text fields, in indexing order.
	pub fn text_parts(&self) -> Vec<String> {
		let mut parts = vec![self.display_name.clone(), self.headline.clone(), self.bio.clone()];

		if !self.interests.is_empty() {
			parts.push(format!("Interests: {}", self.interests.join(", ")));
		}
		if !self.location.trim().is_empty() {
			parts.push(format!("Location: {}", self.location));
		}

		parts
	}
}

pub struct HttpProfileClient {
	cfg: kith_config::Directory,
	client: Client,
}

impl HttpProfileClient {
	pub fn new(cfg: kith_config::Directory) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}
}

impl ProfileClient for HttpProfileClient {
	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Profile>> {
		Box::pin(async move {
			let url = format!("{}/users/{user_id}/profile", self.cfg.api_base);
			let res = self
				.client
				.get(url)
				.headers(crate::bearer_headers(self.cfg.api_key.as_deref())?)
				.send()
				.await?;

			Ok(res.error_for_status()?.json().await?)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn text_parts_include_interests_and_location_when_present() {
		let profile = Profile {
			user_id: "u1".to_string(),
			display_name: "Alice".to_string(),
			headline: "Climber".to_string(),
			bio: "Weekend alpinist.".to_string(),
			interests: vec!["bouldering".to_string(), "jazz".to_string()],
			location: "Salt Lake City".to_string(),
			image_refs: Vec::new(),
		};
		let parts = profile.text_parts();

		assert_eq!(parts.len(), 5);
		assert_eq!(parts[3], "Interests: bouldering, jazz");
		assert_eq!(parts[4], "Location: Salt Lake City");
	}

	#[test]
	fn text_parts_omit_empty_sections() {
		let profile = Profile { user_id: "u1".to_string(), ..Profile::default() };

		assert_eq!(profile.text_parts().len(), 3);
	}
}
