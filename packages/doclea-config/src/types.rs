use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	pub providers: Providers,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	/// Path to the record database (the original ships this as `.doclea/local.db`).
	pub local_db: String,
	/// Path to the vector database (`.doclea/vectors.db`).
	pub vector_db: String,
	pub pool_max_conns: u32,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_hybrid_weight")]
	pub hybrid_weight: f64,
	#[serde(default = "default_search_limit")]
	pub default_limit: u32,
	#[serde(default = "default_list_limit")]
	pub default_list_limit: u32,
	#[serde(default = "default_max_limit")]
	pub max_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_hybrid_weight() -> f64 {
	0.7
}

fn default_search_limit() -> u32 {
	20
}

fn default_list_limit() -> u32 {
	50
}

fn default_max_limit() -> u32 {
	100
}
