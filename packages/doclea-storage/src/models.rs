/// Raw row shape of the `memories` table. Decoded into the API-facing record
/// type exactly once, at the service boundary; JSON columns and epoch
/// timestamps stay untouched here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemoryRow {
	pub id: String,
	pub title: String,
	pub r#type: String,
	pub content: String,
	pub summary: Option<String>,
	pub importance: f64,
	pub tags: String,
	pub related_files: String,
	pub created_at: i64,
	pub accessed_at: i64,
	pub access_count: i64,
	pub needs_review: bool,
}

/// Raw row shape of the `memory_vectors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VectorRow {
	pub id: String,
	pub memory_id: String,
	pub r#type: String,
	pub title: String,
	pub tags: String,
	pub related_files: String,
	pub importance: f64,
	pub embedding: Vec<u8>,
}
