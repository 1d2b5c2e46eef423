pub mod cursor;
pub mod embed;
pub mod list;
pub mod memories;
pub mod search;
pub mod stats;
pub mod time_serde;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

pub use cursor::{Cursor, SortValue};
pub use embed::{EmbedBatchRequest, EmbedBatchResponse, EmbedInfo, EmbedRequest, EmbedResponse};
pub use error::{Error as ServiceError, Result as ServiceResult};
pub use list::{ListRequest, ListResponse, Order, SortKey};
pub use memories::{CreateMemoryRequest, Memory, UpdateMemoryRequest};
pub use search::{
	ScoreBreakdown, SearchRequest, SearchResponse, SearchResult, SimilarResponse, SimilarResult,
};
pub use stats::{RecentResponse, StatsResponse, TagCount};

use doclea_config::{Config, EmbeddingProviderConfig};
use doclea_providers::embedding;
use doclea_storage::{
	db::Db,
	vectors::{VectorFilters, VectorHit, VectorStore},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The closed set of record types a memory may carry.
pub const MEMORY_TYPES: [&str; 5] = ["decision", "solution", "pattern", "architecture", "note"];

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Vector-nearest-neighbour collaborator. Candidates come back sorted
/// ascending by cosine distance; an unavailable index surfaces as an error
/// and the ranker degrades to keyword-only scoring.
pub trait SimilarityProvider
where
	Self: Send + Sync,
{
	fn nearest_k<'a>(
		&'a self,
		query: &'a [f32],
		k: u32,
		filters: &'a VectorFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorHit>>>;

	fn embedding_of<'a>(
		&'a self,
		memory_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}

pub struct DocleaService {
	pub cfg: Config,
	pub db: Db,
	pub vectors: Arc<dyn SimilarityProvider>,
	pub providers: Providers,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl SimilarityProvider for VectorStore {
	fn nearest_k<'a>(
		&'a self,
		query: &'a [f32],
		k: u32,
		filters: &'a VectorFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorHit>>> {
		Box::pin(async move { self.search(query, k, filters).await.map_err(Into::into) })
	}

	fn embedding_of<'a>(
		&'a self,
		memory_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<f32>>>> {
		Box::pin(async move { self.embedding_for(memory_id).await.map_err(Into::into) })
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

impl DocleaService {
	pub fn new(cfg: Config, db: Db, vectors: VectorStore) -> Self {
		Self { cfg, db, vectors: Arc::new(vectors), providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		vectors: Arc<dyn SimilarityProvider>,
		providers: Providers,
	) -> Self {
		Self { cfg, db, vectors, providers }
	}
}

pub(crate) fn validate_memory_type(value: &str) -> ServiceResult<()> {
	if MEMORY_TYPES.contains(&value) {
		Ok(())
	} else {
		Err(ServiceError::InvalidRequest {
			message: format!("Unknown memory type '{value}'."),
		})
	}
}

pub(crate) fn validate_unit_interval(value: f64, field: &str) -> ServiceResult<()> {
	if value.is_finite() && (0.0..=1.0).contains(&value) {
		Ok(())
	} else {
		Err(ServiceError::InvalidRequest {
			message: format!("{field} must be between 0 and 1."),
		})
	}
}

pub(crate) fn validate_limit(limit: u32, max_limit: u32) -> ServiceResult<()> {
	if limit == 0 || limit > max_limit {
		return Err(ServiceError::InvalidRequest {
			message: format!("limit must be between 1 and {max_limit}."),
		});
	}

	Ok(())
}
