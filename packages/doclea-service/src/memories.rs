//! Memory CRUD. Rows are decoded into the API-facing [`Memory`] entity exactly
//! once, here at the service boundary.

use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use doclea_storage::{db::with_retry, models::MemoryRow};

use crate::{DocleaService, ServiceError, ServiceResult, validate_memory_type, validate_unit_interval};

const SELECT_MEMORY: &str = "SELECT id, title, type, content, summary, importance, tags, \
	related_files, created_at, accessed_at, access_count, needs_review FROM memories";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
	pub id: String,
	pub title: String,
	#[serde(rename = "type")]
	pub r#type: String,
	pub content: String,
	pub summary: Option<String>,
	pub importance: f64,
	pub tags: Vec<String>,
	pub related_files: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub accessed_at: OffsetDateTime,
	pub access_count: i64,
	pub needs_review: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemoryRequest {
	pub id: String,
	pub title: String,
	#[serde(rename = "type")]
	pub r#type: String,
	pub content: String,
	#[serde(default)]
	pub summary: Option<String>,
	#[serde(default = "default_importance")]
	pub importance: f64,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub related_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemoryRequest {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default, rename = "type")]
	pub r#type: Option<String>,
	#[serde(default)]
	pub content: Option<String>,
	// `summary: null` and an absent summary both leave the column untouched;
	// clients clear a summary by sending an empty string.
	#[serde(default)]
	pub summary: Option<String>,
	#[serde(default)]
	pub importance: Option<f64>,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub related_files: Option<Vec<String>>,
	#[serde(default)]
	pub needs_review: Option<bool>,
}

fn default_importance() -> f64 {
	0.5
}

impl DocleaService {
	pub async fn create_memory(&self, req: &CreateMemoryRequest) -> ServiceResult<Memory> {
		validate_create(req)?;

		let pool = &self.db.records;
		let id = req.id.as_str();
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let result = with_retry(move || async move {
			sqlx::query(
				"INSERT INTO memories (id, title, type, content, summary, importance, tags, \
				 related_files, created_at, accessed_at, access_count, needs_review) \
				 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0)",
			)
			.bind(id)
			.bind(&req.title)
			.bind(&req.r#type)
			.bind(&req.content)
			.bind(&req.summary)
			.bind(req.importance)
			.bind(encode_string_list(&req.tags))
			.bind(encode_string_list(&req.related_files))
			.bind(now)
			.bind(now)
			.execute(pool)
			.await
			.map(|_| ())
		})
		.await;

		if let Err(err) = result {
			if err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation()) {
				return Err(ServiceError::InvalidRequest {
					message: format!("A memory with id '{id}' already exists."),
				});
			}

			return Err(err.into());
		}

		self.require_memory(id).await
	}

	/// Fetches one memory and bumps its access tracking: `accessed_at` moves
	/// forward only, `access_count` increments exactly once per read. The
	/// returned record reflects the pre-bump state.
	pub async fn get_memory(&self, id: &str) -> ServiceResult<Memory> {
		let row = self.fetch_row(id).await?.ok_or_else(|| not_found(id))?;
		let pool = &self.db.records;
		let bumped = OffsetDateTime::now_utc().unix_timestamp().max(row.accessed_at);

		with_retry(move || async move {
			sqlx::query(
				"UPDATE memories SET accessed_at = ?, access_count = access_count + 1 WHERE id = ?",
			)
			.bind(bumped)
			.bind(id)
			.execute(pool)
			.await
			.map(|_| ())
		})
		.await?;

		memory_from_row(row)
	}

	pub async fn update_memory(&self, id: &str, req: &UpdateMemoryRequest) -> ServiceResult<Memory> {
		validate_update(req)?;

		if self.fetch_row(id).await?.is_none() {
			return Err(not_found(id));
		}
		if !has_changes(req) {
			return self.require_memory(id).await;
		}

		let pool = &self.db.records;

		with_retry(move || async move {
			let mut query = QueryBuilder::new("UPDATE memories SET ");
			let mut assignments = query.separated(", ");

			if let Some(title) = &req.title {
				assignments.push("title = ").push_bind_unseparated(title);
			}
			if let Some(r#type) = &req.r#type {
				assignments.push("type = ").push_bind_unseparated(r#type);
			}
			if let Some(content) = &req.content {
				assignments.push("content = ").push_bind_unseparated(content);
			}
			if let Some(summary) = &req.summary {
				assignments.push("summary = ").push_bind_unseparated(summary);
			}
			if let Some(importance) = req.importance {
				assignments.push("importance = ").push_bind_unseparated(importance);
			}
			if let Some(tags) = &req.tags {
				assignments.push("tags = ").push_bind_unseparated(encode_string_list(tags));
			}
			if let Some(related_files) = &req.related_files {
				assignments
					.push("related_files = ")
					.push_bind_unseparated(encode_string_list(related_files));
			}
			if let Some(needs_review) = req.needs_review {
				assignments.push("needs_review = ").push_bind_unseparated(needs_review);
			}

			query.push(" WHERE id = ").push_bind(id);
			query.build().execute(pool).await.map(|_| ())
		})
		.await?;

		self.require_memory(id).await
	}

	pub async fn delete_memory(&self, id: &str) -> ServiceResult<()> {
		let pool = &self.db.records;
		let affected = with_retry(move || async move {
			sqlx::query("DELETE FROM memories WHERE id = ?")
				.bind(id)
				.execute(pool)
				.await
				.map(|result| result.rows_affected())
		})
		.await?;

		if affected == 0 {
			return Err(not_found(id));
		}

		Ok(())
	}

	pub(crate) async fn fetch_row(&self, id: &str) -> ServiceResult<Option<MemoryRow>> {
		let row = sqlx::query_as::<_, MemoryRow>(&format!("{SELECT_MEMORY} WHERE id = ?"))
			.bind(id)
			.fetch_optional(&self.db.records)
			.await?;

		Ok(row)
	}

	async fn require_memory(&self, id: &str) -> ServiceResult<Memory> {
		let row = self.fetch_row(id).await?.ok_or_else(|| not_found(id))?;

		memory_from_row(row)
	}
}

fn validate_create(req: &CreateMemoryRequest) -> ServiceResult<()> {
	if req.id.trim().is_empty() {
		return Err(invalid("id must not be empty."));
	}
	if req.title.is_empty() || req.title.chars().count() > 500 {
		return Err(invalid("title must be between 1 and 500 characters."));
	}
	if req.content.is_empty() {
		return Err(invalid("content must not be empty."));
	}

	validate_memory_type(&req.r#type)?;
	validate_unit_interval(req.importance, "importance")?;

	Ok(())
}

fn validate_update(req: &UpdateMemoryRequest) -> ServiceResult<()> {
	if let Some(title) = &req.title
		&& (title.is_empty() || title.chars().count() > 500)
	{
		return Err(invalid("title must be between 1 and 500 characters."));
	}
	if let Some(content) = &req.content
		&& content.is_empty()
	{
		return Err(invalid("content must not be empty."));
	}
	if let Some(r#type) = &req.r#type {
		validate_memory_type(r#type)?;
	}
	if let Some(importance) = req.importance {
		validate_unit_interval(importance, "importance")?;
	}

	Ok(())
}

fn has_changes(req: &UpdateMemoryRequest) -> bool {
	req.title.is_some()
		|| req.r#type.is_some()
		|| req.content.is_some()
		|| req.summary.is_some()
		|| req.importance.is_some()
		|| req.tags.is_some()
		|| req.related_files.is_some()
		|| req.needs_review.is_some()
}

fn invalid(message: &str) -> ServiceError {
	ServiceError::InvalidRequest { message: message.into() }
}

fn not_found(id: &str) -> ServiceError {
	ServiceError::NotFound { message: format!("Memory '{id}' not found.") }
}

pub(crate) fn memory_from_row(row: MemoryRow) -> ServiceResult<Memory> {
	Ok(Memory {
		id: row.id,
		title: row.title,
		r#type: row.r#type,
		content: row.content,
		summary: row.summary,
		importance: row.importance,
		tags: decode_string_list(&row.tags),
		related_files: decode_string_list(&row.related_files),
		created_at: timestamp(row.created_at)?,
		accessed_at: timestamp(row.accessed_at)?,
		access_count: row.access_count,
		needs_review: row.needs_review,
	})
}

pub(crate) fn decode_string_list(raw: &str) -> Vec<String> {
	serde_json::from_str(raw).unwrap_or_default()
}

pub(crate) fn encode_string_list(values: &[String]) -> String {
	serde_json::to_string(values).unwrap_or_else(|_| "[]".into())
}

fn timestamp(epoch_seconds: i64) -> ServiceResult<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp(epoch_seconds)
		.map_err(|err| ServiceError::Storage { message: err.to_string() })
}
