use std::{future::Future, path::Path, str::FromStr, time::Duration};

use sqlx::{
	SqlitePool,
	sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::{Result, schema};

const MAX_RETRIES: u32 = 3;

pub struct Db {
	pub records: SqlitePool,
	pub vectors: SqlitePool,
}
impl Db {
	pub async fn connect(cfg: &doclea_config::Storage) -> Result<Self> {
		let records = open_pool(&cfg.local_db, cfg.pool_max_conns).await?;
		let vectors = open_pool(&cfg.vector_db, cfg.pool_max_conns).await?;

		Ok(Self { records, vectors })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		run_statements(&self.records, schema::records_schema()).await?;
		run_statements(&self.vectors, schema::vectors_schema()).await?;

		Ok(())
	}
}

async fn open_pool(path: &str, max_conns: u32) -> Result<SqlitePool> {
	if let Some(parent) = Path::new(path).parent()
		&& !parent.as_os_str().is_empty()
	{
		std::fs::create_dir_all(parent)
			.map_err(|err| crate::Error::InvalidArgument(format!("{path}: {err}")))?;
	}

	let options = SqliteConnectOptions::from_str(path)
		.map_err(sqlx::Error::from)?
		.create_if_missing(true)
		.journal_mode(SqliteJournalMode::Wal)
		.busy_timeout(Duration::from_secs(5))
		.foreign_keys(true);
	let pool = SqlitePoolOptions::new().max_connections(max_conns).connect_with(options).await?;

	Ok(pool)
}

async fn run_statements(pool: &SqlitePool, sql: &str) -> Result<()> {
	for statement in sql.split(';') {
		let trimmed = statement.trim();

		if trimmed.is_empty() {
			continue;
		}

		sqlx::query(trimmed).execute(pool).await?;
	}

	Ok(())
}

/// Retries an operation that failed with a busy or locked database error, with
/// exponential backoff. Any other failure is returned on the first attempt.
pub async fn with_retry<T, F, Fut>(op: F) -> std::result::Result<T, sqlx::Error>
where
	F: Fn() -> Fut,
	Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
	let mut attempt = 0;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if is_busy(&err) && attempt + 1 < MAX_RETRIES => {
				tokio::time::sleep(Duration::from_millis(100 * 2_u64.pow(attempt))).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

fn is_busy(err: &sqlx::Error) -> bool {
	let sqlx::Error::Database(db_err) = err else {
		return false;
	};

	// SQLite primary result codes: 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED.
	matches!(db_err.code().as_deref(), Some("5") | Some("6"))
}
