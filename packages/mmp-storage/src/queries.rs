use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection};
use time::Date;
use uuid::Uuid;

use crate::{
	Result,
	models::{
		ActionItem, ActionItemDependency, AgendaItem, Attendee, Meeting, MeetingProject,
		MeetingVersion, Project, Screenshot,
	},
};

#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
	pub project_name: Option<String>,
	pub from: Option<Date>,
	pub to: Option<Date>,
	pub limit: i64,
	pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ActionItemFilter {
	pub meeting_id: Option<Uuid>,
	pub status: Option<String>,
	pub owner: Option<String>,
	/// Only open items due strictly before this date.
	pub overdue_as_of: Option<Date>,
	pub limit: i64,
}

pub async fn insert_meeting(conn: &mut SqliteConnection, meeting: &Meeting) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO meetings (
	meeting_id,
	project_name,
	meeting_date,
	purpose,
	notes,
	summary,
	created_at,
	updated_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(meeting.meeting_id)
	.bind(meeting.project_name.as_str())
	.bind(meeting.meeting_date)
	.bind(meeting.purpose.as_str())
	.bind(meeting.notes.as_str())
	.bind(meeting.summary.as_deref())
	.bind(meeting.created_at)
	.bind(meeting.updated_at)
	.execute(&mut *conn)
	.await?;

	Ok(())
}

pub async fn update_meeting(conn: &mut SqliteConnection, meeting: &Meeting) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE meetings
SET
	project_name = ?,
	meeting_date = ?,
	purpose = ?,
	notes = ?,
	summary = ?,
	updated_at = ?
WHERE meeting_id = ?",
	)
	.bind(meeting.project_name.as_str())
	.bind(meeting.meeting_date)
	.bind(meeting.purpose.as_str())
	.bind(meeting.notes.as_str())
	.bind(meeting.summary.as_deref())
	.bind(meeting.updated_at)
	.bind(meeting.meeting_id)
	.execute(&mut *conn)
	.await?;

	Ok(result.rows_affected())
}

pub async fn fetch_meeting<'e, E>(executor: E, meeting_id: Uuid) -> Result<Option<Meeting>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let meeting = sqlx::query_as::<_, Meeting>("SELECT * FROM meetings WHERE meeting_id = ?")
		.bind(meeting_id)
		.fetch_optional(executor)
		.await?;

	Ok(meeting)
}

/// Children, classifications, and versions go with it through `ON DELETE CASCADE`.
pub async fn delete_meeting(conn: &mut SqliteConnection, meeting_id: Uuid) -> Result<u64> {
	let result = sqlx::query("DELETE FROM meetings WHERE meeting_id = ?")
		.bind(meeting_id)
		.execute(&mut *conn)
		.await?;

	Ok(result.rows_affected())
}

/// Newest meeting date first.
pub async fn list_meetings<'e, E>(executor: E, filter: &MeetingFilter) -> Result<Vec<Meeting>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM meetings WHERE 1 = 1");

	if let Some(project_name) = filter.project_name.as_ref() {
		builder.push(" AND project_name = ").push_bind(project_name.clone()).push(" COLLATE NOCASE");
	}
	if let Some(from) = filter.from {
		builder.push(" AND meeting_date >= ").push_bind(from);
	}
	if let Some(to) = filter.to {
		builder.push(" AND meeting_date <= ").push_bind(to);
	}

	builder
		.push(" ORDER BY meeting_date DESC, created_at DESC LIMIT ")
		.push_bind(filter.limit)
		.push(" OFFSET ")
		.push_bind(filter.offset);

	let meetings = builder.build_query_as::<Meeting>().fetch_all(executor).await?;

	Ok(meetings)
}

pub async fn replace_agenda_items(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	items: &[AgendaItem],
) -> Result<()> {
	sqlx::query("DELETE FROM agenda_items WHERE meeting_id = ?")
		.bind(meeting_id)
		.execute(&mut *conn)
		.await?;

	for item in items {
		sqlx::query(
			"\
INSERT INTO agenda_items (agenda_item_id, meeting_id, position, item, notes)
VALUES (?, ?, ?, ?, ?)",
		)
		.bind(item.agenda_item_id)
		.bind(meeting_id)
		.bind(item.position)
		.bind(item.item.as_str())
		.bind(item.notes.as_str())
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

pub async fn fetch_agenda_items<'e, E>(executor: E, meeting_id: Uuid) -> Result<Vec<AgendaItem>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let items = sqlx::query_as::<_, AgendaItem>(
		"SELECT * FROM agenda_items WHERE meeting_id = ? ORDER BY position",
	)
	.bind(meeting_id)
	.fetch_all(executor)
	.await?;

	Ok(items)
}

pub async fn replace_attendees(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	attendees: &[Attendee],
) -> Result<()> {
	sqlx::query("DELETE FROM attendees WHERE meeting_id = ?")
		.bind(meeting_id)
		.execute(&mut *conn)
		.await?;

	for attendee in attendees {
		sqlx::query(
			"\
INSERT INTO attendees (attendee_id, meeting_id, position, name, attended)
VALUES (?, ?, ?, ?, ?)",
		)
		.bind(attendee.attendee_id)
		.bind(meeting_id)
		.bind(attendee.position)
		.bind(attendee.name.as_str())
		.bind(attendee.attended)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

pub async fn fetch_attendees<'e, E>(executor: E, meeting_id: Uuid) -> Result<Vec<Attendee>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let attendees = sqlx::query_as::<_, Attendee>(
		"SELECT * FROM attendees WHERE meeting_id = ? ORDER BY position",
	)
	.bind(meeting_id)
	.fetch_all(executor)
	.await?;

	Ok(attendees)
}

/// Drops the meeting's action items (and with them their dependency edges) and inserts `items`.
/// Callers keep ids stable by passing the previous ids back in.
pub async fn replace_action_items(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	items: &[ActionItem],
) -> Result<()> {
	sqlx::query("DELETE FROM action_items WHERE meeting_id = ?")
		.bind(meeting_id)
		.execute(&mut *conn)
		.await?;

	for item in items {
		insert_action_item(&mut *conn, item).await?;
	}

	Ok(())
}

pub async fn insert_action_item(conn: &mut SqliteConnection, item: &ActionItem) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO action_items (
	action_item_id,
	meeting_id,
	position,
	description,
	owner,
	due_date,
	status,
	priority,
	project_id,
	project_confidence,
	completed_at,
	created_at,
	updated_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(item.action_item_id)
	.bind(item.meeting_id)
	.bind(item.position)
	.bind(item.description.as_str())
	.bind(item.owner.as_str())
	.bind(item.due_date)
	.bind(item.status.as_str())
	.bind(item.priority.as_str())
	.bind(item.project_id)
	.bind(item.project_confidence)
	.bind(item.completed_at)
	.bind(item.created_at)
	.bind(item.updated_at)
	.execute(&mut *conn)
	.await?;

	Ok(())
}

pub async fn update_action_item(conn: &mut SqliteConnection, item: &ActionItem) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE action_items
SET
	position = ?,
	description = ?,
	owner = ?,
	due_date = ?,
	status = ?,
	priority = ?,
	project_id = ?,
	project_confidence = ?,
	completed_at = ?,
	updated_at = ?
WHERE action_item_id = ?",
	)
	.bind(item.position)
	.bind(item.description.as_str())
	.bind(item.owner.as_str())
	.bind(item.due_date)
	.bind(item.status.as_str())
	.bind(item.priority.as_str())
	.bind(item.project_id)
	.bind(item.project_confidence)
	.bind(item.completed_at)
	.bind(item.updated_at)
	.bind(item.action_item_id)
	.execute(&mut *conn)
	.await?;

	Ok(result.rows_affected())
}

pub async fn fetch_action_item<'e, E>(executor: E, action_item_id: Uuid) -> Result<Option<ActionItem>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let item =
		sqlx::query_as::<_, ActionItem>("SELECT * FROM action_items WHERE action_item_id = ?")
			.bind(action_item_id)
			.fetch_optional(executor)
			.await?;

	Ok(item)
}

pub async fn fetch_action_items<'e, E>(executor: E, meeting_id: Uuid) -> Result<Vec<ActionItem>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let items = sqlx::query_as::<_, ActionItem>(
		"SELECT * FROM action_items WHERE meeting_id = ? ORDER BY position",
	)
	.bind(meeting_id)
	.fetch_all(executor)
	.await?;

	Ok(items)
}

/// Earliest due date first; undated items last.
pub async fn list_action_items<'e, E>(
	executor: E,
	filter: &ActionItemFilter,
) -> Result<Vec<ActionItem>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM action_items WHERE 1 = 1");

	if let Some(meeting_id) = filter.meeting_id {
		builder.push(" AND meeting_id = ").push_bind(meeting_id);
	}
	if let Some(status) = filter.status.as_ref() {
		builder.push(" AND status = ").push_bind(status.clone());
	}
	if let Some(owner) = filter.owner.as_ref() {
		builder.push(" AND owner = ").push_bind(owner.clone()).push(" COLLATE NOCASE");
	}
	if let Some(today) = filter.overdue_as_of {
		builder
			.push(" AND status <> 'Completed' AND due_date IS NOT NULL AND due_date < ")
			.push_bind(today);
	}

	builder
		.push(" ORDER BY due_date IS NULL, due_date, created_at, position LIMIT ")
		.push_bind(filter.limit);

	let items = builder.build_query_as::<ActionItem>().fetch_all(executor).await?;

	Ok(items)
}

pub async fn replace_dependencies(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	edges: &[ActionItemDependency],
) -> Result<()> {
	sqlx::query(
		"\
DELETE FROM action_item_dependencies
WHERE action_item_id IN (SELECT action_item_id FROM action_items WHERE meeting_id = ?)",
	)
	.bind(meeting_id)
	.execute(&mut *conn)
	.await?;

	for edge in edges {
		sqlx::query(
			"\
INSERT OR IGNORE INTO action_item_dependencies (action_item_id, depends_on_id)
VALUES (?, ?)",
		)
		.bind(edge.action_item_id)
		.bind(edge.depends_on_id)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

pub async fn fetch_dependencies<'e, E>(
	executor: E,
	meeting_id: Uuid,
) -> Result<Vec<ActionItemDependency>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let edges = sqlx::query_as::<_, ActionItemDependency>(
		"\
SELECT d.action_item_id, d.depends_on_id
FROM action_item_dependencies d
JOIN action_items a ON a.action_item_id = d.action_item_id
WHERE a.meeting_id = ?
ORDER BY a.position",
	)
	.bind(meeting_id)
	.fetch_all(executor)
	.await?;

	Ok(edges)
}

pub async fn insert_project<'e, E>(executor: E, project: &Project) -> Result<()>
where
	E: Executor<'e, Database = Sqlite>,
{
	sqlx::query(
		"\
INSERT INTO projects (project_id, name, description, keywords, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(project.project_id)
	.bind(project.name.as_str())
	.bind(project.description.as_str())
	.bind(&project.keywords)
	.bind(project.created_at)
	.bind(project.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_project<'e, E>(executor: E, project_id: Uuid) -> Result<Option<Project>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE project_id = ?")
		.bind(project_id)
		.fetch_optional(executor)
		.await?;

	Ok(project)
}

pub async fn list_projects<'e, E>(executor: E) -> Result<Vec<Project>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let projects = sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY name")
		.fetch_all(executor)
		.await?;

	Ok(projects)
}

pub async fn delete_project<'e, E>(executor: E, project_id: Uuid) -> Result<u64>
where
	E: Executor<'e, Database = Sqlite>,
{
	let result = sqlx::query("DELETE FROM projects WHERE project_id = ?")
		.bind(project_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

pub async fn replace_meeting_projects(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	rows: &[MeetingProject],
) -> Result<()> {
	sqlx::query("DELETE FROM meeting_projects WHERE meeting_id = ?")
		.bind(meeting_id)
		.execute(&mut *conn)
		.await?;

	for row in rows {
		sqlx::query(
			"\
INSERT INTO meeting_projects (
	meeting_id,
	project_id,
	confidence,
	is_primary,
	method,
	keywords_matched,
	reasoning,
	classified_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(meeting_id)
		.bind(row.project_id)
		.bind(row.confidence)
		.bind(row.is_primary)
		.bind(row.method.as_str())
		.bind(&row.keywords_matched)
		.bind(row.reasoning.as_str())
		.bind(row.classified_at)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

/// Primary first, then by confidence.
pub async fn fetch_meeting_projects<'e, E>(
	executor: E,
	meeting_id: Uuid,
) -> Result<Vec<MeetingProject>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let rows = sqlx::query_as::<_, MeetingProject>(
		"\
SELECT *
FROM meeting_projects
WHERE meeting_id = ?
ORDER BY is_primary DESC, confidence DESC",
	)
	.bind(meeting_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn next_version_number(conn: &mut SqliteConnection, meeting_id: Uuid) -> Result<i64> {
	let current: Option<i64> =
		sqlx::query_scalar("SELECT MAX(version_number) FROM meeting_versions WHERE meeting_id = ?")
			.bind(meeting_id)
			.fetch_one(&mut *conn)
			.await?;

	Ok(current.unwrap_or(0) + 1)
}

pub async fn insert_version(conn: &mut SqliteConnection, version: &MeetingVersion) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO meeting_versions (
	version_id,
	meeting_id,
	version_number,
	change_summary,
	snapshot,
	created_at
)
VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(version.version_id)
	.bind(version.meeting_id)
	.bind(version.version_number)
	.bind(version.change_summary.as_str())
	.bind(&version.snapshot)
	.bind(version.created_at)
	.execute(&mut *conn)
	.await?;

	Ok(())
}

/// Newest first.
pub async fn list_versions<'e, E>(executor: E, meeting_id: Uuid) -> Result<Vec<MeetingVersion>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let versions = sqlx::query_as::<_, MeetingVersion>(
		"SELECT * FROM meeting_versions WHERE meeting_id = ? ORDER BY version_number DESC",
	)
	.bind(meeting_id)
	.fetch_all(executor)
	.await?;

	Ok(versions)
}

pub async fn insert_screenshot<'e, E>(executor: E, screenshot: &Screenshot) -> Result<()>
where
	E: Executor<'e, Database = Sqlite>,
{
	sqlx::query(
		"\
INSERT INTO screenshots (
	screenshot_id,
	original_name,
	stored_path,
	content_type,
	size_bytes,
	created_at
)
VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(screenshot.screenshot_id)
	.bind(screenshot.original_name.as_str())
	.bind(screenshot.stored_path.as_str())
	.bind(screenshot.content_type.as_str())
	.bind(screenshot.size_bytes)
	.bind(screenshot.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_screenshot<'e, E>(executor: E, screenshot_id: Uuid) -> Result<Option<Screenshot>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let screenshot =
		sqlx::query_as::<_, Screenshot>("SELECT * FROM screenshots WHERE screenshot_id = ?")
			.bind(screenshot_id)
			.fetch_optional(executor)
			.await?;

	Ok(screenshot)
}
