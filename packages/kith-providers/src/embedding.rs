use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, EmbeddingBackend, Error, Result};

/// OpenAI-compatible embeddings endpoint.
pub struct HttpEmbeddingBackend {
	cfg: kith_config::EmbeddingProviderConfig,
	client: Client,
}

impl HttpEmbeddingBackend {
	pub fn new(cfg: kith_config::EmbeddingProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}

	async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"input": [text],
			"dimensions": self.cfg.dimensions,
		});
		let res = self
			.client
			.post(url)
			.headers(crate::bearer_headers(Some(&self.cfg.api_key))?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;
		let mut vectors = parse_embedding_response(json)?;

		if vectors.is_empty() {
			return Err(Error::InvalidResponse(
				"Embedding response contained no vectors.".to_string(),
			));
		}

		let vector = vectors.swap_remove(0);

		if vector.len() != self.cfg.dimensions as usize {
			return Err(Error::InvalidResponse(format!(
				"Embedding dimension {} does not match configured dimensions {}.",
				vector.len(),
				self.cfg.dimensions
			)));
		}

		Ok(vector)
	}
}

impl EmbeddingBackend for HttpEmbeddingBackend {
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(self.embed_once(text))
	}

	fn provider_name(&self) -> &str {
		&self.cfg.provider_id
	}

	fn model_name(&self) -> &str {
		&self.cfg.model
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse("Embedding response is missing data array.".to_string()))?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse("Embedding item missing embedding array.".to_string())
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| {
				Error::InvalidResponse("Embedding value must be numeric.".to_string())
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn rejects_non_numeric_embedding_values() {
		let json = serde_json::json!({
			"data": [{ "index": 0, "embedding": [1.0, "nan"] }]
		});

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse(_))));
	}
}
