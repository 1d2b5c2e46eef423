use std::collections::HashSet;

use doclea_service::{ListRequest, Order, ServiceError, SortKey};
use doclea_testkit::TestDatabase;

fn list_request(sort: SortKey, order: Order, limit: u32) -> ListRequest {
	ListRequest {
		r#type: None,
		tags: Vec::new(),
		sort,
		order,
		cursor: None,
		limit: Some(limit),
	}
}

#[tokio::test]
async fn walking_pages_covers_every_row_exactly_once() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	// Duplicate importance values on purpose; the id tiebreak must keep the
	// walk free of skips and repeats.
	let importances = [0.9, 0.5, 0.5, 0.5, 0.2, 0.2, 0.7];

	for (index, importance) in importances.iter().enumerate() {
		super::seed_memory(
			&service,
			&format!("mem-{index}"),
			&format!("memory {index}"),
			"note",
			"body",
			*importance,
			&[],
		)
		.await;
	}

	let mut request = list_request(SortKey::Importance, Order::Desc, 3);
	let mut seen = Vec::new();
	let mut pages = 0;

	loop {
		let page = service.list_memories(&request).await.expect("List failed.");

		pages += 1;

		for memory in &page.data {
			seen.push(memory.id.clone());
		}

		if !page.has_more {
			assert!(page.next_cursor.is_none());

			break;
		}

		request.cursor = Some(page.next_cursor.expect("hasMore pages carry a cursor."));
	}

	assert_eq!(pages, 3);
	assert_eq!(seen.len(), importances.len());
	assert_eq!(seen.iter().collect::<HashSet<_>>().len(), importances.len());

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn pages_are_ordered_by_sort_key_then_id() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "b", "same title", "note", "body", 0.5, &[]).await;
	super::seed_memory(&service, "a", "same title", "note", "body", 0.5, &[]).await;
	super::seed_memory(&service, "c", "other title", "note", "body", 0.5, &[]).await;

	let first = service
		.list_memories(&list_request(SortKey::Title, Order::Asc, 2))
		.await
		.expect("List failed.");

	assert_eq!(first.data.len(), 2);
	assert_eq!(first.data[0].id, "c");
	assert_eq!(first.data[1].id, "a");
	assert!(first.has_more);

	let mut request = list_request(SortKey::Title, Order::Asc, 2);

	request.cursor = first.next_cursor;

	let second = service.list_memories(&request).await.expect("List failed.");

	assert_eq!(second.data.len(), 1);
	assert_eq!(second.data[0].id, "b");
	assert!(!second.has_more);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn malformed_cursor_starts_from_the_beginning() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "a", "first", "note", "body", 0.5, &[]).await;
	super::seed_memory(&service, "b", "second", "note", "body", 0.5, &[]).await;

	let baseline = service
		.list_memories(&list_request(SortKey::Title, Order::Asc, 10))
		.await
		.expect("List failed.");
	let mut request = list_request(SortKey::Title, Order::Asc, 10);

	request.cursor = Some("@@not-a-cursor@@".to_string());

	let garbled = service.list_memories(&request).await.expect("List failed.");

	assert_eq!(
		baseline.data.iter().map(|memory| &memory.id).collect::<Vec<_>>(),
		garbled.data.iter().map(|memory| &memory.id).collect::<Vec<_>>()
	);

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn filters_by_type_and_tags() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;

	super::seed_memory(&service, "a", "alpha", "decision", "body", 0.5, &["rust", "db"]).await;
	super::seed_memory(&service, "b", "beta", "note", "body", 0.5, &["rust"]).await;
	super::seed_memory(&service, "c", "gamma", "note", "body", 0.5, &["web"]).await;

	let mut request = list_request(SortKey::Created, Order::Desc, 10);

	request.r#type = Some("note".to_string());

	let notes = service.list_memories(&request).await.expect("List failed.");

	assert_eq!(notes.data.len(), 2);

	let mut request = list_request(SortKey::Created, Order::Desc, 10);

	request.tags = vec!["rust".to_string()];

	let tagged = service.list_memories(&request).await.expect("List failed.");
	let ids: HashSet<&str> = tagged.data.iter().map(|memory| memory.id.as_str()).collect();

	assert_eq!(ids, HashSet::from(["a", "b"]));

	test_db.cleanup().expect("Failed to cleanup test database.");
}

#[tokio::test]
async fn rejects_out_of_range_limits() {
	let test_db = TestDatabase::new().expect("Failed to create test database.");
	let service = super::build_service(&test_db).await;
	let result = service
		.list_memories(&list_request(SortKey::Created, Order::Desc, 101))
		.await;

	assert!(matches!(result, Err(ServiceError::InvalidRequest { .. })));

	test_db.cleanup().expect("Failed to cleanup test database.");
}
