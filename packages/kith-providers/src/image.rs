use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{BoxFuture, Error, ImageAnalyzer, Result};

/// What the image-understanding service said about a user's photos.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ImageAnalysis {
	/// One combined natural-language description across all analyzed images.
	pub combined_text: String,
	pub analyzed_count: u32,
}

pub struct HttpImageAnalyzer {
	cfg: kith_config::ImageAnalysisConfig,
	client: Client,
}

impl HttpImageAnalyzer {
	pub fn new(cfg: kith_config::ImageAnalysisConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}
}

impl ImageAnalyzer for HttpImageAnalyzer {
	fn analyze<'a>(
		&'a self,
		user_id: &'a str,
		image_refs: &'a [String],
	) -> BoxFuture<'a, Result<ImageAnalysis>> {
		Box::pin(async move {
			if image_refs.is_empty() {
				return Ok(ImageAnalysis::default());
			}

			let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
			let body = serde_json::json!({
				"user_id": user_id,
				"image_refs": image_refs,
			});
			let res = self
				.client
				.post(url)
				.headers(crate::bearer_headers(Some(&self.cfg.api_key))?)
				.json(&body)
				.send()
				.await?;
			let analysis: ImageAnalysis = res.error_for_status()?.json().await?;

			if analysis.analyzed_count > 0 && analysis.combined_text.trim().is_empty() {
				return Err(Error::InvalidResponse(
					"Image analysis reported results but no description.".to_string(),
				));
			}

			Ok(analysis)
		})
	}
}
