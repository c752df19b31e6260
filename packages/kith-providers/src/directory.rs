use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, DirectoryClient, Error, Result};

pub struct HttpDirectoryClient {
	cfg: kith_config::Directory,
	client: Client,
}

impl HttpDirectoryClient {
	pub fn new(cfg: kith_config::Directory) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}

	async fn get_json(&self, path: &str) -> Result<Value> {
		let url = format!("{}{path}", self.cfg.api_base);
		let res = self
			.client
			.get(url)
			.headers(crate::bearer_headers(self.cfg.api_key.as_deref())?)
			.send()
			.await?;

		Ok(res.error_for_status()?.json().await?)
	}
}

impl DirectoryClient for HttpDirectoryClient {
	fn list_available_user_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let json = self.get_json("/users/available").await?;

			parse_id_list(&json, "user_ids")
		})
	}

	fn list_all_user_ids<'a>(
		&'a self,
		offset: u32,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let json = self.get_json(&format!("/users?offset={offset}&limit={limit}")).await?;

			parse_id_list(&json, "user_ids")
		})
	}

	fn get_user_friend_ids<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let json = self.get_json(&format!("/users/{user_id}/friends")).await?;

			parse_id_list(&json, "friend_ids")
		})
	}
}

fn parse_id_list(json: &Value, field: &str) -> Result<Vec<String>> {
	let ids = json
		.get(field)
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse(format!("Directory response is missing {field}.")))?;

	ids.iter()
		.map(|id| {
			id.as_str().map(|id| id.to_string()).ok_or_else(|| {
				Error::InvalidResponse(format!("Directory {field} entries must be strings."))
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_id_lists() {
		let json = serde_json::json!({ "user_ids": ["u1", "u2"] });

		assert_eq!(parse_id_list(&json, "user_ids").unwrap(), vec!["u1", "u2"]);
	}

	#[test]
	fn rejects_missing_or_malformed_fields() {
		let missing = serde_json::json!({ "nope": [] });
		let malformed = serde_json::json!({ "user_ids": [1, 2] });

		assert!(parse_id_list(&missing, "user_ids").is_err());
		assert!(parse_id_list(&malformed, "user_ids").is_err());
	}
}
