use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, ConsentClient, Error, Result};

/// Consent lookups run under their own, much tighter timeout than the rest
/// of the directory traffic.
pub struct HttpConsentClient {
	cfg: kith_config::Directory,
	client: Client,
}

impl HttpConsentClient {
	pub fn new(cfg: kith_config::Directory) -> Result<Self> {
		let client =
			Client::builder().timeout(Duration::from_millis(cfg.consent.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}
}

impl ConsentClient for HttpConsentClient {
	fn check_search_consent<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let url = format!("{}/users/{user_id}/consent/search", self.cfg.api_base);
			let res = self
				.client
				.get(url)
				.headers(crate::bearer_headers(self.cfg.api_key.as_deref())?)
				.send()
				.await
				.map_err(|err| Error::ConsentUnavailable(err.to_string()))?;
			let json: Value = res
				.error_for_status()
				.map_err(|err| Error::ConsentUnavailable(err.to_string()))?
				.json()
				.await
				.map_err(|err| Error::ConsentUnavailable(err.to_string()))?;

			parse_consent_response(&json)
		})
	}
}

fn parse_consent_response(json: &Value) -> Result<bool> {
	json.get("allowed").and_then(|v| v.as_bool()).ok_or_else(|| {
		Error::ConsentUnavailable("Consent response is missing the allowed flag.".to_string())
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_decisions() {
		assert!(parse_consent_response(&serde_json::json!({ "allowed": true })).unwrap());
		assert!(!parse_consent_response(&serde_json::json!({ "allowed": false })).unwrap());
	}

	#[test]
	fn malformed_decision_is_a_service_error() {
		let err = parse_consent_response(&serde_json::json!({})).unwrap_err();

		assert!(matches!(err, Error::ConsentUnavailable(_)));
	}
}
