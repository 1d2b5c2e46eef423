//! Seek-based listing of memories. The pager is a pure transform from
//! `(filters, sort, order, cursor, limit)` to `(page, nextCursor, hasMore)`;
//! no server-side cursor state exists.

use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;

use doclea_storage::models::MemoryRow;

use crate::{
	DocleaService, Memory, ServiceResult,
	cursor::{Cursor, SortValue},
	memories::memory_from_row,
	validate_limit, validate_memory_type,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
	#[default]
	Created,
	Accessed,
	Importance,
	Title,
}
impl SortKey {
	fn column(self) -> &'static str {
		match self {
			Self::Created => "created_at",
			Self::Accessed => "accessed_at",
			Self::Importance => "importance",
			Self::Title => "title",
		}
	}

	fn sort_value(self, row: &MemoryRow) -> SortValue {
		match self {
			Self::Created => SortValue::Int(row.created_at),
			Self::Accessed => SortValue::Int(row.accessed_at),
			Self::Importance => SortValue::Float(row.importance),
			Self::Title => SortValue::Text(row.title.clone()),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
	Asc,
	#[default]
	Desc,
}
impl Order {
	fn op(self) -> &'static str {
		match self {
			Self::Asc => ">",
			Self::Desc => "<",
		}
	}

	fn direction(self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequest {
	#[serde(default, rename = "type")]
	pub r#type: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub sort: SortKey,
	#[serde(default)]
	pub order: Order,
	#[serde(default)]
	pub cursor: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
	pub data: Vec<Memory>,
	#[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
	pub next_cursor: Option<String>,
	#[serde(rename = "hasMore")]
	pub has_more: bool,
}

impl DocleaService {
	pub async fn list_memories(&self, req: &ListRequest) -> ServiceResult<ListResponse> {
		let limit = req.limit.unwrap_or(self.cfg.search.default_list_limit);

		validate_limit(limit, self.cfg.search.max_limit)?;

		if let Some(r#type) = &req.r#type {
			validate_memory_type(r#type)?;
		}

		// A corrupt cursor degrades to "start from the beginning".
		let cursor = req.cursor.as_deref().and_then(|token| {
			let decoded = Cursor::decode(token);

			if decoded.is_none() {
				tracing::warn!("Ignoring malformed pagination cursor.");
			}

			decoded
		});
		let column = req.sort.column();
		let op = req.order.op();
		let direction = req.order.direction();
		let mut query = QueryBuilder::new(
			"SELECT id, title, type, content, summary, importance, tags, related_files, \
			 created_at, accessed_at, access_count, needs_review FROM memories WHERE 1 = 1",
		);

		if let Some(r#type) = &req.r#type {
			query.push(" AND type = ").push_bind(r#type);
		}
		for tag in &req.tags {
			// Tags live in a JSON array column; substring match on the quoted
			// element avoids accidental prefix hits.
			query.push(" AND tags LIKE ").push_bind(format!("%\"{tag}\"%"));
		}
		if let Some(cursor) = &cursor {
			// Compound seek predicate: the id tiebreak keeps the order strict
			// under duplicate sort-key values, so pages never skip or repeat.
			query.push(" AND (").push(column).push(format!(" {op} "));
			push_sort_value(&mut query, &cursor.sort_value);
			query.push(" OR (").push(column).push(" = ");
			push_sort_value(&mut query, &cursor.sort_value);
			query
				.push(format!(" AND id {op} "))
				.push_bind(cursor.id.as_str())
				.push("))");
		}

		query
			.push(format!(" ORDER BY {column} {direction}, id {direction} LIMIT "))
			.push_bind(i64::from(limit) + 1);

		let mut rows = query.build_query_as::<MemoryRow>().fetch_all(&self.db.records).await?;
		let has_more = rows.len() > limit as usize;

		if has_more {
			rows.truncate(limit as usize);
		}

		let next_cursor = if has_more {
			rows.last()
				.map(|row| Cursor::new(req.sort.sort_value(row), row.id.as_str()).encode())
		} else {
			None
		};
		let data = rows.into_iter().map(memory_from_row).collect::<ServiceResult<Vec<_>>>()?;

		Ok(ListResponse { data, next_cursor, has_more })
	}
}

fn push_sort_value(query: &mut QueryBuilder<'_, sqlx::Sqlite>, value: &SortValue) {
	match value {
		SortValue::Int(value) => query.push_bind(*value),
		SortValue::Float(value) => query.push_bind(*value),
		SortValue::Text(value) => query.push_bind(value.clone()),
	};
}
