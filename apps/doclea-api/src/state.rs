use std::sync::Arc;

use doclea_service::DocleaService;
use doclea_storage::{db::Db, vectors::VectorStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DocleaService>,
}
impl AppState {
	pub async fn new(config: doclea_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage).await?;

		db.ensure_schema().await?;

		let vectors = VectorStore::new(db.vectors.clone(), config.storage.vector_dim);
		let service = DocleaService::new(config, db, vectors);

		Ok(Self { service: Arc::new(service) })
	}
}
