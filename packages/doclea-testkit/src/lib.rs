mod error;

pub use error::{Error, Result};

use std::{env, fs, path::PathBuf};

use uuid::Uuid;

/// A uniquely-named scratch directory holding the record and vector database
/// files for one test. Removed on cleanup, or on drop as a fallback.
pub struct TestDatabase {
	dir: PathBuf,
	cleaned: bool,
}
impl TestDatabase {
	pub fn new() -> Result<Self> {
		let dir = env::temp_dir().join(format!("doclea_test_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&dir)?;

		Ok(Self { dir, cleaned: false })
	}

	pub fn local_db(&self) -> String {
		self.dir.join("local.db").to_string_lossy().into_owned()
	}

	pub fn vector_db(&self) -> String {
		self.dir.join("vectors.db").to_string_lossy().into_owned()
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner()
	}

	fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		fs::remove_dir_all(&self.dir)?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}
		if let Err(err) = fs::remove_dir_all(&self.dir) {
			eprintln!("Test database cleanup failed: {err}.");
		}
	}
}
