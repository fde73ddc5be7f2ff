use sqlx::types::Json;
use time::{OffsetDateTime, macros::date};
use uuid::Uuid;

use mmp_config::Sqlite;
use mmp_storage::{
	db::Db,
	models::{ActionItem, ActionItemDependency, AgendaItem, Meeting, MeetingProject, Project},
	queries::{self, ActionItemFilter, MeetingFilter},
};
use mmp_testkit::TestDatabase;

async fn connect(test_db: &TestDatabase) -> Db {
	let cfg = Sqlite { dsn: test_db.dsn().to_string(), pool_max_conns: 4 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to SQLite.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

fn meeting(project_name: &str, meeting_date: time::Date) -> Meeting {
	let now = OffsetDateTime::now_utc();

	Meeting {
		meeting_id: Uuid::new_v4(),
		project_name: project_name.to_string(),
		meeting_date,
		purpose: "Sync".to_string(),
		notes: String::new(),
		summary: None,
		created_at: now,
		updated_at: now,
	}
}

fn action_item(meeting_id: Uuid, position: i64, status: &str, due: Option<time::Date>) -> ActionItem {
	let now = OffsetDateTime::now_utc();

	ActionItem {
		action_item_id: Uuid::new_v4(),
		meeting_id,
		position,
		description: format!("Task {position}"),
		owner: "Ann".to_string(),
		due_date: due,
		status: status.to_string(),
		priority: "medium".to_string(),
		project_id: None,
		project_confidence: None,
		completed_at: None,
		created_at: now,
		updated_at: now,
	}
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	db.ensure_schema().await.expect("Failed to re-run schema.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN ('meetings', 'action_items', 'meeting_projects')",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 3);

	db.pool.close().await;

	assert!(test_db.cleanup().await.is_ok(), "Failed to cleanup test database.");
}

#[tokio::test]
async fn meetings_list_newest_first_and_cascade_on_delete() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let older = meeting("Apollo", date!(2025 - 01 - 10));
	let newer = meeting("apollo", date!(2025 - 02 - 10));
	let other = meeting("Zeus", date!(2025 - 03 - 10));
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	for row in [&older, &newer, &other] {
		queries::insert_meeting(&mut conn, row).await.expect("Failed to insert meeting.");
	}

	queries::replace_agenda_items(
		&mut conn,
		older.meeting_id,
		&[AgendaItem {
			agenda_item_id: Uuid::new_v4(),
			meeting_id: older.meeting_id,
			position: 0,
			item: "Budget".to_string(),
			notes: String::new(),
		}],
	)
	.await
	.expect("Failed to insert agenda items.");

	let filter =
		MeetingFilter { project_name: Some("APOLLO".to_string()), limit: 10, ..Default::default() };
	let listed = queries::list_meetings(&db.pool, &filter).await.expect("Failed to list meetings.");
	let ids: Vec<Uuid> = listed.iter().map(|row| row.meeting_id).collect();

	assert_eq!(ids, vec![newer.meeting_id, older.meeting_id]);

	let deleted =
		queries::delete_meeting(&mut conn, older.meeting_id).await.expect("Failed to delete.");

	assert_eq!(deleted, 1);

	let agenda = queries::fetch_agenda_items(&db.pool, older.meeting_id)
		.await
		.expect("Failed to fetch agenda items.");

	assert!(agenda.is_empty());

	drop(conn);
	db.pool.close().await;

	assert!(test_db.cleanup().await.is_ok(), "Failed to cleanup test database.");
}

#[tokio::test]
async fn constraints_reject_bad_status_and_second_primary() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let row = meeting("Apollo", date!(2025 - 01 - 10));
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	queries::insert_meeting(&mut conn, &row).await.expect("Failed to insert meeting.");

	let bad = action_item(row.meeting_id, 0, "Done", None);

	assert!(queries::insert_action_item(&mut conn, &bad).await.is_err());

	let now = OffsetDateTime::now_utc();
	let mut project_ids = Vec::new();

	for name in ["Mobile", "Billing"] {
		let project = Project {
			project_id: Uuid::new_v4(),
			name: name.to_string(),
			description: String::new(),
			keywords: Json(vec![name.to_lowercase()]),
			created_at: now,
			updated_at: now,
		};

		queries::insert_project(&db.pool, &project).await.expect("Failed to insert project.");
		project_ids.push(project.project_id);
	}

	let classification = |project_id, is_primary| MeetingProject {
		meeting_id: row.meeting_id,
		project_id,
		confidence: 0.5,
		is_primary,
		method: "keyword".to_string(),
		keywords_matched: Json(Vec::new()),
		reasoning: String::new(),
		classified_at: now,
	};
	let two_primaries =
		[classification(project_ids[0], true), classification(project_ids[1], true)];

	assert!(
		queries::replace_meeting_projects(&mut conn, row.meeting_id, &two_primaries)
			.await
			.is_err()
	);

	let one_primary = [classification(project_ids[0], true), classification(project_ids[1], false)];

	queries::replace_meeting_projects(&mut conn, row.meeting_id, &one_primary)
		.await
		.expect("Failed to store classifications.");

	let stored = queries::fetch_meeting_projects(&db.pool, row.meeting_id)
		.await
		.expect("Failed to fetch classifications.");

	assert_eq!(stored.len(), 2);
	assert!(stored[0].is_primary);

	drop(conn);
	db.pool.close().await;

	assert!(test_db.cleanup().await.is_ok(), "Failed to cleanup test database.");
}

#[tokio::test]
async fn overdue_filter_and_dependency_cascade() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let row = meeting("Apollo", date!(2025 - 01 - 10));
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	queries::insert_meeting(&mut conn, &row).await.expect("Failed to insert meeting.");

	let late = action_item(row.meeting_id, 0, "Pending", Some(date!(2025 - 01 - 01)));
	let done = action_item(row.meeting_id, 1, "Completed", Some(date!(2025 - 01 - 01)));
	let future = action_item(row.meeting_id, 2, "In Progress", Some(date!(2030 - 01 - 01)));

	queries::replace_action_items(
		&mut conn,
		row.meeting_id,
		&[late.clone(), done.clone(), future.clone()],
	)
	.await
	.expect("Failed to insert action items.");
	queries::replace_dependencies(
		&mut conn,
		row.meeting_id,
		&[ActionItemDependency {
			action_item_id: future.action_item_id,
			depends_on_id: late.action_item_id,
		}],
	)
	.await
	.expect("Failed to insert dependencies.");

	let filter = ActionItemFilter {
		overdue_as_of: Some(date!(2025 - 02 - 01)),
		limit: 50,
		..Default::default()
	};
	let overdue =
		queries::list_action_items(&db.pool, &filter).await.expect("Failed to list action items.");

	assert_eq!(overdue.len(), 1);
	assert_eq!(overdue[0].action_item_id, late.action_item_id);

	let edges = queries::fetch_dependencies(&db.pool, row.meeting_id)
		.await
		.expect("Failed to fetch dependencies.");

	assert_eq!(edges.len(), 1);

	queries::replace_action_items(&mut conn, row.meeting_id, &[late.clone()])
		.await
		.expect("Failed to replace action items.");

	let edges = queries::fetch_dependencies(&db.pool, row.meeting_id)
		.await
		.expect("Failed to fetch dependencies.");

	assert!(edges.is_empty());

	drop(conn);
	db.pool.close().await;

	assert!(test_db.cleanup().await.is_ok(), "Failed to cleanup test database.");
}
