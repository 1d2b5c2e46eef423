pub fn records_schema() -> &'static str {
	include_str!("../../../sql/local.sql")
}

pub fn vectors_schema() -> &'static str {
	include_str!("../../../sql/vectors.sql")
}
