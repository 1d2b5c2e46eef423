use doclea_service::{CreateMemoryRequest, ServiceError, UpdateMemoryRequest};
use doclea_testkit::TestDatabase;

fn create_request(id: &str) -> CreateMemoryRequest {
	CreateMemoryRequest {
		id: id.to_string(),
		title: "How we paginate".to_string(),
		r#type: "decision".to_string(),
		content: "Seek-based pagination with an id tiebreak.".to_string(),
		summary: Some("Pagination decision.".to_string()),
		importance: 0.8,
		tags: vec!["pagination".to_string(), "db".to_string()],
		related_files: vec!["src/list.rs".to_string()],
	}
}

#[tokio::test]
async fn create_then_read_bumps_access_tracking() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;
	let created = service.create_memory(&create_request("m1")).await.expect("Create failed.");

	assert_eq!(created.access_count, 0);
	assert!(created.created_at <= created.accessed_at);
	assert_eq!(created.tags, ["pagination", "db"]);

	// The read returns the pre-bump state; the bump lands for the next read.
	let first_read = service.get_memory("m1").await.expect("Get failed.");

	assert_eq!(first_read.access_count, 0);

	let second_read = service.get_memory("m1").await.expect("Get failed.");

	assert_eq!(second_read.access_count, 1);
	assert!(second_read.created_at <= second_read.accessed_at);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn rejects_duplicate_ids() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	service.create_memory(&create_request("m1")).await.expect("Create failed.");

	let duplicate = service.create_memory(&create_request("m1")).await;

	assert!(matches!(duplicate, Err(ServiceError::InvalidRequest { .. })));

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn rejects_malformed_create_requests() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	let mut request = create_request("m1");

	request.title = String::new();

	assert!(matches!(
		service.create_memory(&request).await,
		Err(ServiceError::InvalidRequest { .. })
	));

	let mut request = create_request("m1");

	request.r#type = "ballad".to_string();

	assert!(matches!(
		service.create_memory(&request).await,
		Err(ServiceError::InvalidRequest { .. })
	));

	let mut request = create_request("m1");

	request.importance = 1.5;

	assert!(matches!(
		service.create_memory(&request).await,
		Err(ServiceError::InvalidRequest { .. })
	));

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn partial_update_leaves_other_fields_alone() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	service.create_memory(&create_request("m1")).await.expect("Create failed.");

	let updated = service
		.update_memory(
			"m1",
			&UpdateMemoryRequest {
				title: Some("How we paginate, revised".to_string()),
				needs_review: Some(true),
				..Default::default()
			},
		)
		.await
		.expect("Update failed.");

	assert_eq!(updated.title, "How we paginate, revised");
	assert!(updated.needs_review);
	assert_eq!(updated.content, "Seek-based pagination with an id tiebreak.");
	assert_eq!(updated.importance, 0.8);
	// Updates are not reads; access tracking stays put.
	assert_eq!(updated.access_count, 0);

	let missing = service
		.update_memory("ghost", &UpdateMemoryRequest {
			title: Some("x".to_string()),
			..Default::default()
		})
		.await;

	assert!(matches!(missing, Err(ServiceError::NotFound { .. })));

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn delete_is_hard_and_idempotence_is_a_404() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	service.create_memory(&create_request("m1")).await.expect("Create failed.");
	service.delete_memory("m1").await.expect("Delete failed.");

	assert!(matches!(service.get_memory("m1").await, Err(ServiceError::NotFound { .. })));
	assert!(matches!(service.delete_memory("m1").await, Err(ServiceError::NotFound { .. })));

	test_db.cleanup().expect("Failed to cleanup test database.");
}
