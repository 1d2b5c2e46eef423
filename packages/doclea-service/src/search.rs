//! Hybrid retrieval: a keyword substring channel and a vector similarity
//! channel merged into one ranked result list.
//!
//! Scoring notes. Semantic candidates are first seeded with the unweighted
//! normalized score `1 - distance / maxDistance` (`maxDistance` floored at
//! 0.01 so identical vectors do not divide by zero). When a record also
//! matches on keywords, the final score becomes
//! `semantic * hybridWeight + keyword * (1 - hybridWeight)`. A keyword-only
//! hit keeps only the keyword share `keyword * (1 - hybridWeight)`: a record
//! with no semantic support may appear but cannot outscore a strong hybrid
//! hit. That scaling also applies when no embedding was supplied at all, so
//! absolute scores are not comparable between semantic-enabled and
//! keyword-only requests.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;

use doclea_storage::vectors::VectorFilters;

use crate::{
	DocleaService, ServiceError, ServiceResult, memories::decode_string_list, validate_limit,
	validate_memory_type, validate_unit_interval,
};

const MAX_DISTANCE_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	#[serde(default, rename = "type")]
	pub r#type: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default, rename = "hybridWeight")]
	pub hybrid_weight: Option<f64>,
	#[serde(default, rename = "minImportance")]
	pub min_importance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
	pub semantic: f64,
	pub keyword: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
	pub id: String,
	pub memory_id: String,
	#[serde(rename = "type")]
	pub r#type: String,
	pub title: String,
	pub tags: Vec<String>,
	pub related_files: Vec<String>,
	pub importance: f64,
	pub score: f64,
	pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<SearchResult>,
	pub query: String,
	#[serde(rename = "hybridWeight")]
	pub hybrid_weight: f64,
	#[serde(rename = "totalMatches")]
	pub total_matches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarResult {
	pub id: String,
	pub memory_id: String,
	#[serde(rename = "type")]
	pub r#type: String,
	pub title: String,
	pub tags: Vec<String>,
	pub related_files: Vec<String>,
	pub importance: f64,
	pub distance: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarResponse {
	pub results: Vec<SimilarResult>,
}

#[derive(Debug, sqlx::FromRow)]
struct KeywordRow {
	id: String,
	title: String,
	r#type: String,
	tags: String,
	related_files: String,
	importance: f64,
	match_score: i64,
}

impl DocleaService {
	pub async fn search(&self, req: &SearchRequest) -> ServiceResult<SearchResponse> {
		if req.query.trim().is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must not be empty.".into(),
			});
		}

		let limit = req.limit.unwrap_or(self.cfg.search.default_limit);

		validate_limit(limit, self.cfg.search.max_limit)?;

		let hybrid_weight = req.hybrid_weight.unwrap_or(self.cfg.search.hybrid_weight);

		validate_unit_interval(hybrid_weight, "hybridWeight")?;

		if let Some(min_importance) = req.min_importance {
			validate_unit_interval(min_importance, "minImportance")?;
		}
		if let Some(r#type) = &req.r#type {
			validate_memory_type(r#type)?;
		}

		// Both channels over-fetch to give the merge room to re-rank.
		let fetch = limit * 2;
		let mut results = Vec::new();

		if let Some(embedding) = req.embedding.as_deref().filter(|embedding| !embedding.is_empty())
		{
			let filters = VectorFilters {
				r#type: req.r#type.clone(),
				min_importance: req.min_importance,
			};

			// Similarity failures are non-fatal; the ranker degrades to the
			// keyword channel alone.
			match self.vectors.nearest_k(embedding, fetch, &filters).await {
				Ok(hits) => {
					let max_distance = hits
						.iter()
						.map(|hit| f64::from(hit.distance))
						.fold(MAX_DISTANCE_FLOOR, f64::max);

					for hit in hits {
						let semantic = 1. - f64::from(hit.distance) / max_distance;

						results.push(SearchResult {
							id: hit.id,
							memory_id: hit.memory_id,
							r#type: hit.r#type,
							title: hit.title,
							tags: hit.tags,
							related_files: hit.related_files,
							importance: hit.importance,
							score: semantic,
							breakdown: ScoreBreakdown { semantic, keyword: 0. },
						});
					}
				},
				Err(err) => {
					tracing::warn!(
						"Similarity search unavailable, degrading to keyword-only scoring: {err}"
					);
				},
			}
		}

		let keyword_rows = self
			.keyword_candidates(&req.query, req.r#type.as_deref(), req.min_importance, fetch)
			.await?;
		let max_matches =
			keyword_rows.iter().map(|row| row.match_score).max().unwrap_or(0).max(1) as f64;

		for row in keyword_rows {
			let keyword = row.match_score as f64 / max_matches;

			if let Some(existing) = results.iter_mut().find(|result| result.memory_id == row.id) {
				existing.breakdown.keyword = keyword;
				existing.score = existing.breakdown.semantic * hybrid_weight
					+ keyword * (1. - hybrid_weight);
			} else {
				results.push(SearchResult {
					memory_id: row.id.clone(),
					id: row.id,
					r#type: row.r#type,
					title: row.title,
					tags: decode_string_list(&row.tags),
					related_files: decode_string_list(&row.related_files),
					importance: row.importance,
					score: keyword * (1. - hybrid_weight),
					breakdown: ScoreBreakdown { semantic: 0., keyword },
				});
			}
		}

		let total_matches = results.len();

		// Stable sort; equal scores keep their merge order.
		results
			.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
		results.truncate(limit as usize);

		Ok(SearchResponse { results, query: req.query.clone(), hybrid_weight, total_matches })
	}

	/// Nearest stored vectors to the embedding of an existing memory, the
	/// memory itself excluded. A memory without a stored embedding yields an
	/// empty result, not an error.
	pub async fn find_similar(&self, id: &str, limit: Option<u32>) -> ServiceResult<SimilarResponse> {
		let limit = limit.unwrap_or(10);

		validate_limit(limit, self.cfg.search.max_limit)?;

		let Some(embedding) = self.vectors.embedding_of(id).await? else {
			return Ok(SimilarResponse { results: Vec::new() });
		};
		let hits = self.vectors.nearest_k(&embedding, limit + 1, &VectorFilters::default()).await?;
		let results = hits
			.into_iter()
			.filter(|hit| hit.memory_id != id)
			.take(limit as usize)
			.map(|hit| SimilarResult {
				id: hit.id,
				memory_id: hit.memory_id,
				r#type: hit.r#type,
				title: hit.title,
				tags: hit.tags,
				related_files: hit.related_files,
				importance: hit.importance,
				distance: hit.distance,
			})
			.collect();

		Ok(SimilarResponse { results })
	}

	async fn keyword_candidates(
		&self,
		query_text: &str,
		r#type: Option<&str>,
		min_importance: Option<f64>,
		fetch: u32,
	) -> ServiceResult<Vec<KeywordRow>> {
		let pattern = format!("%{}%", query_text.to_lowercase());
		let mut query = QueryBuilder::new("SELECT id, title, type, tags, related_files, importance, ");

		query
			.push("(CASE WHEN lower(title) LIKE ")
			.push_bind(pattern.clone())
			.push(" THEN 2 ELSE 0 END + CASE WHEN lower(content) LIKE ")
			.push_bind(pattern.clone())
			.push(" THEN 1 ELSE 0 END + CASE WHEN lower(summary) LIKE ")
			.push_bind(pattern.clone())
			.push(" THEN 1 ELSE 0 END) AS match_score FROM memories WHERE (lower(title) LIKE ")
			.push_bind(pattern.clone())
			.push(" OR lower(content) LIKE ")
			.push_bind(pattern.clone())
			.push(" OR lower(summary) LIKE ")
			.push_bind(pattern)
			.push(")");

		if let Some(r#type) = r#type {
			query.push(" AND type = ").push_bind(r#type.to_string());
		}
		if let Some(min_importance) = min_importance {
			query.push(" AND importance >= ").push_bind(min_importance);
		}

		query.push(" ORDER BY match_score DESC LIMIT ").push_bind(i64::from(fetch));

		let rows = query.build_query_as::<KeywordRow>().fetch_all(&self.db.records).await?;

		Ok(rows)
	}
}
