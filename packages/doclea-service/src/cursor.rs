//! Opaque pagination cursor: URL-safe base64 over a small JSON record holding
//! the last-seen row's sort-key value and its id as a tiebreaker. Stateless
//! and never persisted; a cursor is only meaningful under the same
//! sort/order/filter combination it was issued for.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// The sort-key value captured by a cursor. Timestamps travel as raw epoch
/// seconds so the seek predicate compares like against like in SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
	Int(i64),
	Float(f64),
	Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
	#[serde(rename = "sortValue")]
	pub sort_value: SortValue,
	pub id: String,
}

impl Cursor {
	pub fn new(sort_value: SortValue, id: impl Into<String>) -> Self {
		Self { sort_value, id: id.into() }
	}

	pub fn encode(&self) -> String {
		let raw = serde_json::to_vec(self).unwrap_or_default();

		URL_SAFE_NO_PAD.encode(raw)
	}

	/// A malformed token is not an error: the caller treats it as "no cursor"
	/// and starts from the beginning.
	pub fn decode(token: &str) -> Option<Self> {
		let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;

		serde_json::from_slice(&bytes).ok()
	}
}
