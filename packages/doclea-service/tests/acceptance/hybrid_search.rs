use std::sync::Arc;

use doclea_service::{Providers, SearchRequest, ServiceError};
use doclea_testkit::TestDatabase;

use super::FailingSimilarity;

fn search_request(query: &str, embedding: Option<Vec<f32>>) -> SearchRequest {
	SearchRequest {
		query: query.to_string(),
		embedding,
		r#type: None,
		limit: Some(10),
		hybrid_weight: Some(0.7),
		min_importance: None,
	}
}

#[tokio::test]
async fn hybrid_hit_outranks_either_single_channel() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	// a: keyword only. b: semantic only (distance 0.2). c: both channels
	// (distance 0.1). d: far vector (distance 1.0) anchoring maxDistance.
	super::seed_memory(&service, "a", "foo roadmap", "note", "alpha", 0.5, &[]).await;
	super::seed_memory(&service, "b", "beta guide", "note", "beta", 0.5, &[]).await;
	super::seed_memory(&service, "c", "foo handbook", "note", "gamma", 0.5, &[]).await;
	super::seed_memory(&service, "d", "delta", "note", "delta", 0.5, &[]).await;
	super::seed_vector(&service, "b", &[0.8, 0.6, 0.0, 0.0]).await;
	super::seed_vector(&service, "c", &[0.9, 0.435_889_9, 0.0, 0.0]).await;
	super::seed_vector(&service, "d", &[0.0, 1.0, 0.0, 0.0]).await;

	let response = service
		.search(&search_request("foo", Some(vec![1.0, 0.0, 0.0, 0.0])))
		.await
		.expect("Search failed.");

	assert_eq!(response.total_matches, 4);

	let order: Vec<&str> =
		response.results.iter().map(|result| result.memory_id.as_str()).collect();

	assert_eq!(order, ["c", "b", "a", "d"]);

	// c: semantic 1 - 0.1/1.0 = 0.9 merged with a full keyword match.
	let c = &response.results[0];

	assert!((c.breakdown.semantic - 0.9).abs() < 1e-3);
	assert!((c.breakdown.keyword - 1.0).abs() < 1e-9);
	assert!((c.score - (0.9 * 0.7 + 1.0 * 0.3)).abs() < 1e-3);

	// b never matched on keywords, so it keeps its seeded normalized score.
	let b = &response.results[1];

	assert!((b.score - 0.8).abs() < 1e-3);
	assert!((b.breakdown.keyword - 0.0).abs() < 1e-9);

	// a is keyword-only and only earns the keyword share of the weight.
	let a = &response.results[2];

	assert!((a.score - 0.3).abs() < 1e-9);
	assert!((a.breakdown.semantic - 0.0).abs() < 1e-9);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn scores_are_sorted_non_increasing() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "a", "search tips", "note", "search engines", 0.5, &[]).await;
	super::seed_memory(&service, "b", "unrelated", "note", "search", 0.5, &[]).await;
	super::seed_memory(&service, "c", "search", "note", "plain", 0.5, &[]).await;
	super::seed_vector(&service, "a", &[1.0, 0.0, 0.0, 0.0]).await;
	super::seed_vector(&service, "b", &[0.0, 1.0, 0.0, 0.0]).await;

	let response = service
		.search(&search_request("search", Some(vec![1.0, 0.0, 0.0, 0.0])))
		.await
		.expect("Search failed.");

	assert!(!response.results.is_empty());
	assert!(
		response
			.results
			.windows(2)
			.all(|pair| pair[0].score >= pair[1].score)
	);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn no_embedding_degrades_to_keyword_only() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "a", "foo roadmap", "note", "alpha", 0.5, &[]).await;
	super::seed_memory(&service, "c", "foo handbook", "note", "gamma", 0.5, &[]).await;
	super::seed_vector(&service, "c", &[1.0, 0.0, 0.0, 0.0]).await;

	let response =
		service.search(&search_request("foo", None)).await.expect("Search failed.");

	assert_eq!(response.results.len(), 2);

	for result in &response.results {
		assert_eq!(result.breakdown.semantic, 0.0);
		// Keyword-only mode still scales by (1 - hybridWeight).
		assert!((result.score - result.breakdown.keyword * 0.3).abs() < 1e-9);
	}

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn empty_embedding_is_treated_as_absent() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "a", "foo roadmap", "note", "alpha", 0.5, &[]).await;
	super::seed_vector(&service, "a", &[1.0, 0.0, 0.0, 0.0]).await;

	let with_empty = service
		.search(&search_request("foo", Some(Vec::new())))
		.await
		.expect("Search failed.");
	let without = service.search(&search_request("foo", None)).await.expect("Search failed.");

	assert_eq!(with_empty.results.len(), without.results.len());
	assert_eq!(with_empty.results[0].breakdown.semantic, 0.0);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn similarity_failure_degrades_to_keyword_channel() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service =
		super::build_service_with(&test_db, Arc::new(FailingSimilarity), Providers::default())
			.await;

	super::seed_memory(&service, "a", "foo roadmap", "note", "alpha", 0.5, &[]).await;

	let response = service
		.search(&search_request("foo", Some(vec![1.0, 0.0, 0.0, 0.0])))
		.await
		.expect("Search should not propagate similarity failures.");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].memory_id, "a");
	assert_eq!(response.results[0].breakdown.semantic, 0.0);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn type_and_importance_filters_apply_to_keyword_channel() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "a", "foo decision", "decision", "alpha", 0.9, &[]).await;
	super::seed_memory(&service, "b", "foo note", "note", "beta", 0.2, &[]).await;

	let mut request = search_request("foo", None);

	request.r#type = Some("decision".to_string());

	let by_type = service.search(&request).await.expect("Search failed.");

	assert_eq!(by_type.results.len(), 1);
	assert_eq!(by_type.results[0].memory_id, "a");

	let mut request = search_request("foo", None);

	request.min_importance = Some(0.5);

	let by_importance = service.search(&request).await.expect("Search failed.");

	assert_eq!(by_importance.results.len(), 1);
	assert_eq!(by_importance.results[0].memory_id, "a");

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn find_similar_excludes_the_anchor_memory() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_vector(&service, "b", &[0.8, 0.6, 0.0, 0.0]).await;
	super::seed_vector(&service, "c", &[0.9, 0.435_889_9, 0.0, 0.0]).await;
	super::seed_vector(&service, "d", &[0.0, 1.0, 0.0, 0.0]).await;

	let response = service.find_similar("c", None).await.expect("find_similar failed.");
	let ids: Vec<&str> = response.results.iter().map(|result| result.memory_id.as_str()).collect();

	assert_eq!(ids, ["b", "d"]);

	let missing = service.find_similar("nope", None).await.expect("find_similar failed.");

	assert!(missing.results.is_empty());

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn rejects_invalid_search_requests() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	let empty_query = service.search(&search_request("   ", None)).await;

	assert!(matches!(empty_query, Err(ServiceError::InvalidRequest { .. })));

	let mut request = search_request("foo", None);

	request.hybrid_weight = Some(1.5);

	let bad_weight = service.search(&request).await;

	assert!(matches!(bad_weight, Err(ServiceError::InvalidRequest { .. })));

	let mut request = search_request("foo", None);

	request.limit = Some(0);

	let bad_limit = service.search(&request).await;

	assert!(matches!(bad_limit, Err(ServiceError::InvalidRequest { .. })));

	test_db.cleanup().expect("Failed to cleanup test database.");
}
