use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::warn;

use crate::{Result, models::VectorRow};

/// Nearest-neighbour hit, carrying the denormalized record summary stored
/// alongside the embedding.
#[derive(Debug, Clone)]
pub struct VectorHit {
	pub id: String,
	pub memory_id: String,
	pub r#type: String,
	pub title: String,
	pub tags: Vec<String>,
	pub related_files: Vec<String>,
	pub importance: f64,
	pub distance: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VectorFilters {
	pub r#type: Option<String>,
	pub min_importance: Option<f64>,
}

/// Brute-force cosine similarity provider over the vectors database.
///
/// The corpus is a personal knowledge base, small enough that an exact scan
/// beats maintaining an ANN index. Candidates come back sorted ascending by
/// cosine distance (0 = identical direction, 2 = opposite).
pub struct VectorStore {
	pub pool: SqlitePool,
	pub vector_dim: u32,
}
impl VectorStore {
	pub fn new(pool: SqlitePool, vector_dim: u32) -> Self {
		Self { pool, vector_dim }
	}

	pub async fn search(
		&self,
		query: &[f32],
		k: u32,
		filters: &VectorFilters,
	) -> Result<Vec<VectorHit>> {
		let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
			"SELECT id, memory_id, type, title, tags, related_files, importance, embedding \
             FROM memory_vectors",
		);
		let mut has_where = false;

		if let Some(memory_type) = &filters.r#type {
			builder.push(" WHERE type = ");
			builder.push_bind(memory_type);

			has_where = true;
		}
		if let Some(min_importance) = filters.min_importance {
			builder.push(if has_where { " AND importance >= " } else { " WHERE importance >= " });
			builder.push_bind(min_importance);
		}

		let rows: Vec<VectorRow> = builder.build_query_as().fetch_all(&self.pool).await?;
		let mut hits = Vec::with_capacity(rows.len());

		for row in rows {
			let embedding = match vector_from_bytes(&row.embedding) {
				Ok(embedding) => embedding,
				Err(err) => {
					warn!(memory_id = %row.memory_id, error = %err, "Skipping undecodable embedding.");

					continue;
				},
			};

			if embedding.len() != query.len() {
				warn!(
					memory_id = %row.memory_id,
					stored = embedding.len(),
					queried = query.len(),
					"Skipping embedding with mismatched dimension."
				);

				continue;
			}

			let distance = cosine_distance(query, &embedding);

			hits.push(VectorHit {
				id: row.id,
				memory_id: row.memory_id,
				r#type: row.r#type,
				title: row.title,
				tags: decode_string_list(&row.tags),
				related_files: decode_string_list(&row.related_files),
				importance: row.importance,
				distance,
			});
		}

		hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(k as usize);

		Ok(hits)
	}

	pub async fn embedding_for(&self, memory_id: &str) -> Result<Option<Vec<f32>>> {
		let row: Option<(Vec<u8>,)> =
			sqlx::query_as("SELECT embedding FROM memory_vectors WHERE memory_id = ?")
				.bind(memory_id)
				.fetch_optional(&self.pool)
				.await?;
		let Some((blob,)) = row else {
			return Ok(None);
		};

		Ok(Some(vector_from_bytes(&blob)?))
	}
}

/// Cosine distance between two equal-length vectors. A zero-magnitude vector
/// has no direction; treat it as maximally distant from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b.iter()) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 2.0;
	}

	1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn vector_to_bytes(vec: &[f32]) -> Vec<u8> {
	let mut out = Vec::with_capacity(vec.len() * 4);

	for value in vec {
		out.extend_from_slice(&value.to_le_bytes());
	}

	out
}

pub fn vector_from_bytes(bytes: &[u8]) -> Result<Vec<f32>> {
	if bytes.len() % 4 != 0 {
		return Err(crate::Error::InvalidArgument(format!(
			"Embedding blob length {} is not a multiple of 4.",
			bytes.len()
		)));
	}

	Ok(bytes.chunks_exact(4).map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])).collect())
}

fn decode_string_list(raw: &str) -> Vec<String> {
	if raw.is_empty() {
		return Vec::new();
	}

	serde_json::from_str(raw).unwrap_or_default()
}
