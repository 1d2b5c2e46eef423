//! Embedding endpoints, delegated to the configured HTTP provider.

use serde::{Deserialize, Serialize};

use crate::{DocleaService, ServiceError, ServiceResult};

const MAX_BATCH_TEXTS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
	pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
	pub embedding: Vec<f32>,
	pub dimensions: usize,
	pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbedBatchRequest {
	pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedBatchResponse {
	pub embeddings: Vec<Vec<f32>>,
	pub dimensions: usize,
	pub model: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedInfo {
	pub model: String,
	pub dimensions: u32,
}

impl DocleaService {
	pub async fn embed_text(&self, req: &EmbedRequest) -> ServiceResult<EmbedResponse> {
		if req.text.trim().is_empty() {
			return Err(invalid("text must not be empty."));
		}

		let cfg = &self.cfg.providers.embedding;
		let texts = [req.text.clone()];
		let mut embeddings = self.providers.embedding.embed(cfg, &texts).await?;
		let embedding = embeddings.pop().ok_or_else(|| ServiceError::Provider {
			message: "Embedding provider returned no vectors.".into(),
		})?;

		self.check_dimensions(embedding.len())?;

		Ok(EmbedResponse {
			dimensions: embedding.len(),
			embedding,
			model: cfg.model.clone(),
		})
	}

	pub async fn embed_batch(&self, req: &EmbedBatchRequest) -> ServiceResult<EmbedBatchResponse> {
		if req.texts.is_empty() || req.texts.len() > MAX_BATCH_TEXTS {
			return Err(invalid(&format!("texts must hold between 1 and {MAX_BATCH_TEXTS} entries.")));
		}
		if req.texts.iter().any(|text| text.trim().is_empty()) {
			return Err(invalid("texts must not contain empty entries."));
		}

		let cfg = &self.cfg.providers.embedding;
		let embeddings = self.providers.embedding.embed(cfg, &req.texts).await?;

		if embeddings.len() != req.texts.len() {
			return Err(ServiceError::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					embeddings.len(),
					req.texts.len()
				),
			});
		}
		for embedding in &embeddings {
			self.check_dimensions(embedding.len())?;
		}

		Ok(EmbedBatchResponse {
			dimensions: cfg.dimensions as usize,
			embeddings,
			model: cfg.model.clone(),
		})
	}

	pub fn embed_info(&self) -> EmbedInfo {
		let cfg = &self.cfg.providers.embedding;

		EmbedInfo { model: cfg.model.clone(), dimensions: cfg.dimensions }
	}

	fn check_dimensions(&self, actual: usize) -> ServiceResult<()> {
		let expected = self.cfg.providers.embedding.dimensions as usize;

		if actual != expected {
			return Err(ServiceError::Provider {
				message: format!("Embedding provider returned {actual} dimensions, expected {expected}."),
			});
		}

		Ok(())
	}
}

fn invalid(message: &str) -> ServiceError {
	ServiceError::InvalidRequest { message: message.into() }
}
