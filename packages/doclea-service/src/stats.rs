//! Aggregate views over the memories table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use doclea_storage::models::MemoryRow;

use crate::{DocleaService, Memory, ServiceResult, memories::memory_from_row};

const RECENT_WINDOW_SECS: i64 = 7 * 86_400;
const STALE_WINDOW_SECS: i64 = 30 * 86_400;
const TOP_TAGS_LIMIT: i64 = 10;
const RECENT_MEMORIES_LIMIT: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
	pub total: i64,
	#[serde(rename = "byType")]
	pub by_type: BTreeMap<String, i64>,
	#[serde(rename = "recentCount")]
	pub recent_count: i64,
	#[serde(rename = "staleCount")]
	pub stale_count: i64,
	#[serde(rename = "avgImportance")]
	pub avg_importance: f64,
	#[serde(rename = "topTags")]
	pub top_tags: Vec<TagCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagCount {
	pub tag: String,
	pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
	pub memories: Vec<Memory>,
}

impl DocleaService {
	pub async fn stats(&self) -> ServiceResult<StatsResponse> {
		let pool = &self.db.records;
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM memories")
			.fetch_one(pool)
			.await?;
		let by_type = sqlx::query_as::<_, (String, i64)>(
			"SELECT type, COUNT(*) FROM memories GROUP BY type",
		)
		.fetch_all(pool)
		.await?
		.into_iter()
		.collect();
		let recent_count = sqlx::query_scalar::<_, i64>(
			"SELECT COUNT(*) FROM memories WHERE created_at >= ?",
		)
		.bind(now - RECENT_WINDOW_SECS)
		.fetch_one(pool)
		.await?;
		let stale_count = sqlx::query_scalar::<_, i64>(
			"SELECT COUNT(*) FROM memories WHERE accessed_at < ?",
		)
		.bind(now - STALE_WINDOW_SECS)
		.fetch_one(pool)
		.await?;
		let avg_importance = sqlx::query_scalar::<_, f64>(
			"SELECT COALESCE(AVG(importance), 0.0) FROM memories",
		)
		.fetch_one(pool)
		.await?;
		let top_tags = sqlx::query_as::<_, (String, i64)>(
			"SELECT value, COUNT(*) AS count FROM memories, json_each(memories.tags) \
			 GROUP BY value ORDER BY count DESC LIMIT ?",
		)
		.bind(TOP_TAGS_LIMIT)
		.fetch_all(pool)
		.await?
		.into_iter()
		.map(|(tag, count)| TagCount { tag, count })
		.collect();

		Ok(StatsResponse { total, by_type, recent_count, stale_count, avg_importance, top_tags })
	}

	pub async fn recent_memories(&self) -> ServiceResult<RecentResponse> {
		let rows = sqlx::query_as::<_, MemoryRow>(
			"SELECT id, title, type, content, summary, importance, tags, related_files, \
			 created_at, accessed_at, access_count, needs_review FROM memories \
			 ORDER BY created_at DESC, id DESC LIMIT ?",
		)
		.bind(RECENT_MEMORIES_LIMIT)
		.fetch_all(&self.db.records)
		.await?;
		let memories = rows.into_iter().map(memory_from_row).collect::<ServiceResult<Vec<_>>>()?;

		Ok(RecentResponse { memories })
	}
}
