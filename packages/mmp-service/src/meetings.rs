use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{SqliteConnection, types::Json};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, MeetingService, Result};
use mmp_domain::{
	reorder::{self, ReorderError},
	status::{self, ActionStatus, Priority},
	validate::{self, MeetingInput, ValidMeeting},
};
use mmp_storage::{
	models::{ActionItem, ActionItemDependency, AgendaItem, Attendee, Meeting, MeetingVersion},
	queries::{self, MeetingFilter},
};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Clone, Serialize)]
pub struct MeetingView {
	pub meeting_id: Uuid,
	pub project_name: String,
	#[serde(serialize_with = "mmp_domain::date_serde::serialize")]
	pub meeting_date: Date,
	pub purpose: String,
	pub agenda_items: Vec<AgendaItemView>,
	pub attendees: Vec<AttendeeView>,
	pub action_items: Vec<ActionItemView>,
	pub notes: String,
	pub summary: Option<String>,
	/// Primary first.
	pub projects: Vec<ProjectMatchView>,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub created_at: OffsetDateTime,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgendaItemView {
	pub agenda_item_id: Uuid,
	pub item: String,
	pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendeeView {
	pub attendee_id: Uuid,
	pub name: String,
	pub attended: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionItemView {
	pub action_item_id: Uuid,
	pub meeting_id: Uuid,
	pub description: String,
	pub owner: String,
	#[serde(with = "mmp_domain::date_serde::option")]
	pub due_date: Option<Date>,
	pub status: ActionStatus,
	pub priority: Priority,
	pub project_id: Option<Uuid>,
	pub project_confidence: Option<f32>,
	#[serde(serialize_with = "crate::time_serde::serialize_option")]
	pub completed_at: Option<OffsetDateTime>,
	pub depends_on: Vec<Uuid>,
	pub is_overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectMatchView {
	pub project_id: Uuid,
	pub project_name: String,
	pub confidence: f32,
	pub is_primary: bool,
	pub method: String,
	pub keywords_matched: Vec<String>,
	pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingSummary {
	pub meeting_id: Uuid,
	pub project_name: String,
	#[serde(serialize_with = "mmp_domain::date_serde::serialize")]
	pub meeting_date: Date,
	pub purpose: String,
	pub summary: Option<String>,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub created_at: OffsetDateTime,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionView {
	pub version_number: i64,
	pub change_summary: String,
	pub snapshot: Value,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingListQuery {
	pub project: Option<String>,
	pub from: Option<String>,
	pub to: Option<String>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderList {
	AgendaItems,
	Attendees,
	ActionItems,
}
impl ReorderList {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AgendaItems => "agenda_items",
			Self::Attendees => "attendees",
			Self::ActionItems => "action_items",
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
	pub list: ReorderList,
	pub from: usize,
	pub to: usize,
}

impl MeetingService {
	pub async fn create_meeting(&self, input: MeetingInput) -> Result<MeetingView> {
		let valid = validate::meeting(&input)?;
		let now = OffsetDateTime::now_utc();
		let meeting = Meeting {
			meeting_id: Uuid::new_v4(),
			project_name: valid.project_name.clone(),
			meeting_date: valid.meeting_date,
			purpose: valid.purpose.clone(),
			notes: valid.notes.clone(),
			summary: None,
			created_at: now,
			updated_at: now,
		};
		let mut tx = self.db.pool.begin().await?;

		queries::insert_meeting(&mut tx, &meeting).await?;
		write_children(&mut tx, meeting.meeting_id, &valid, &[], now).await?;

		let view = record_version(&mut tx, meeting.meeting_id, "Created.", now).await?;

		tx.commit().await?;

		tracing::info!(meeting_id = %meeting.meeting_id, "Meeting created.");

		Ok(view)
	}

	pub async fn get_meeting(&self, meeting_id: Uuid) -> Result<MeetingView> {
		let mut conn = self.db.pool.acquire().await?;

		load_view(&mut conn, meeting_id).await?.ok_or_else(|| meeting_not_found(meeting_id))
	}

	/// Newest meeting date first.
	pub async fn list_meetings(&self, query: MeetingListQuery) -> Result<Vec<MeetingSummary>> {
		let filter = MeetingFilter {
			project_name: query
				.project
				.map(|project| project.trim().to_string())
				.filter(|project| !project.is_empty()),
			from: optional_date(query.from.as_deref(), "$.from")?,
			to: optional_date(query.to.as_deref(), "$.to")?,
			limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT),
			offset: query.offset.unwrap_or(0).max(0),
		};

		if let (Some(from), Some(to)) = (filter.from, filter.to)
			&& from > to
		{
			return Err(Error::invalid_field("$.from", "from must not be after to."));
		}

		let rows = queries::list_meetings(&self.db.pool, &filter).await?;

		Ok(rows
			.into_iter()
			.map(|row| MeetingSummary {
				meeting_id: row.meeting_id,
				project_name: row.project_name,
				meeting_date: row.meeting_date,
				purpose: row.purpose,
				summary: row.summary,
				created_at: row.created_at,
				updated_at: row.updated_at,
			})
			.collect())
	}

	/// Replaces every field and child list. Action items keep their identity (and with it their
	/// project link and completion time) when the submission carries their id.
	pub async fn update_meeting(
		&self,
		meeting_id: Uuid,
		input: MeetingInput,
	) -> Result<MeetingView> {
		let valid = validate::meeting(&input)?;
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut meeting) = queries::fetch_meeting(&mut *tx, meeting_id).await? else {
			return Err(meeting_not_found(meeting_id));
		};
		let previous = queries::fetch_action_items(&mut *tx, meeting_id).await?;

		meeting.project_name = valid.project_name.clone();
		meeting.meeting_date = valid.meeting_date;
		meeting.purpose = valid.purpose.clone();
		meeting.notes = valid.notes.clone();
		meeting.updated_at = now;

		queries::update_meeting(&mut tx, &meeting).await?;
		write_children(&mut tx, meeting_id, &valid, &previous, now).await?;

		let view = record_version(&mut tx, meeting_id, "Updated.", now).await?;

		tx.commit().await?;

		tracing::info!(%meeting_id, "Meeting updated.");

		Ok(view)
	}

	pub async fn delete_meeting(&self, meeting_id: Uuid) -> Result<()> {
		let mut conn = self.db.pool.acquire().await?;
		let deleted = queries::delete_meeting(&mut conn, meeting_id).await?;

		if deleted == 0 {
			return Err(meeting_not_found(meeting_id));
		}

		tracing::info!(%meeting_id, "Meeting deleted.");

		Ok(())
	}

	/// Newest first.
	pub async fn list_versions(&self, meeting_id: Uuid) -> Result<Vec<VersionView>> {
		if queries::fetch_meeting(&self.db.pool, meeting_id).await?.is_none() {
			return Err(meeting_not_found(meeting_id));
		}

		let versions = queries::list_versions(&self.db.pool, meeting_id).await?;

		Ok(versions
			.into_iter()
			.map(|version| VersionView {
				version_number: version.version_number,
				change_summary: version.change_summary,
				snapshot: version.snapshot.0,
				created_at: version.created_at,
			})
			.collect())
	}

	/// Moves one entry of a child list and renumbers the list densely.
	pub async fn reorder(&self, meeting_id: Uuid, req: ReorderRequest) -> Result<MeetingView> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut meeting) = queries::fetch_meeting(&mut *tx, meeting_id).await? else {
			return Err(meeting_not_found(meeting_id));
		};

		match req.list {
			ReorderList::AgendaItems => {
				let mut items = queries::fetch_agenda_items(&mut *tx, meeting_id).await?;

				move_entry(&mut items, &req)?;

				for (position, item) in items.iter_mut().enumerate() {
					item.position = position as i64;
				}

				queries::replace_agenda_items(&mut tx, meeting_id, &items).await?;
			},
			ReorderList::Attendees => {
				let mut attendees = queries::fetch_attendees(&mut *tx, meeting_id).await?;

				move_entry(&mut attendees, &req)?;

				for (position, attendee) in attendees.iter_mut().enumerate() {
					attendee.position = position as i64;
				}

				queries::replace_attendees(&mut tx, meeting_id, &attendees).await?;
			},
			ReorderList::ActionItems => {
				let mut items = queries::fetch_action_items(&mut *tx, meeting_id).await?;

				move_entry(&mut items, &req)?;

				for (position, item) in items.iter_mut().enumerate() {
					item.position = position as i64;

					queries::update_action_item(&mut tx, item).await?;
				}
			},
		}

		meeting.updated_at = now;

		queries::update_meeting(&mut tx, &meeting).await?;

		let summary = format!("Reordered {}.", req.list.as_str());
		let view = record_version(&mut tx, meeting_id, &summary, now).await?;

		tx.commit().await?;

		tracing::info!(
			%meeting_id,
			list = req.list.as_str(),
			from = req.from,
			to = req.to,
			"Meeting list reordered."
		);

		Ok(view)
	}
}

pub(crate) fn meeting_not_found(meeting_id: Uuid) -> Error {
	Error::NotFound { message: format!("Meeting {meeting_id} does not exist.") }
}

/// Reads a meeting with all of its children.
pub(crate) async fn load_view(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
) -> Result<Option<MeetingView>> {
	let Some(meeting) = queries::fetch_meeting(&mut *conn, meeting_id).await? else {
		return Ok(None);
	};
	let agenda_items = queries::fetch_agenda_items(&mut *conn, meeting_id).await?;
	let attendees = queries::fetch_attendees(&mut *conn, meeting_id).await?;
	let action_items = queries::fetch_action_items(&mut *conn, meeting_id).await?;
	let dependencies = queries::fetch_dependencies(&mut *conn, meeting_id).await?;
	let classifications = queries::fetch_meeting_projects(&mut *conn, meeting_id).await?;
	let today = OffsetDateTime::now_utc().date();
	let mut depends_on: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

	for edge in dependencies {
		depends_on.entry(edge.action_item_id).or_default().push(edge.depends_on_id);
	}

	let mut projects = Vec::with_capacity(classifications.len());

	for row in classifications {
		let project_name = queries::fetch_project(&mut *conn, row.project_id)
			.await?
			.map(|project| project.name)
			.unwrap_or_default();

		projects.push(ProjectMatchView {
			project_id: row.project_id,
			project_name,
			confidence: row.confidence,
			is_primary: row.is_primary,
			method: row.method,
			keywords_matched: row.keywords_matched.0,
			reasoning: row.reasoning,
		});
	}

	let action_items = action_items
		.into_iter()
		.map(|item| {
			let depends_on = depends_on.remove(&item.action_item_id).unwrap_or_default();

			action_item_view(item, depends_on, today)
		})
		.collect::<Result<Vec<_>>>()?;

	Ok(Some(MeetingView {
		meeting_id: meeting.meeting_id,
		project_name: meeting.project_name,
		meeting_date: meeting.meeting_date,
		purpose: meeting.purpose,
		agenda_items: agenda_items
			.into_iter()
			.map(|item| AgendaItemView {
				agenda_item_id: item.agenda_item_id,
				item: item.item,
				notes: item.notes,
			})
			.collect(),
		attendees: attendees
			.into_iter()
			.map(|attendee| AttendeeView {
				attendee_id: attendee.attendee_id,
				name: attendee.name,
				attended: attendee.attended,
			})
			.collect(),
		action_items,
		notes: meeting.notes,
		summary: meeting.summary,
		projects,
		created_at: meeting.created_at,
		updated_at: meeting.updated_at,
	}))
}

pub(crate) fn action_item_view(
	item: ActionItem,
	depends_on: Vec<Uuid>,
	today: Date,
) -> Result<ActionItemView> {
	let status = stored_status(&item.status)?;
	let priority = Priority::parse(&item.priority).ok_or_else(|| Error::Storage {
		message: format!("Stored action item has unknown priority {:?}.", item.priority),
	})?;

	Ok(ActionItemView {
		action_item_id: item.action_item_id,
		meeting_id: item.meeting_id,
		is_overdue: status::is_overdue(item.due_date, status, today),
		description: item.description,
		owner: item.owner,
		due_date: item.due_date,
		status,
		priority,
		project_id: item.project_id,
		project_confidence: item.project_confidence,
		completed_at: item.completed_at,
		depends_on,
	})
}

pub(crate) fn stored_status(raw: &str) -> Result<ActionStatus> {
	ActionStatus::parse(raw).ok_or_else(|| Error::Storage {
		message: format!("Stored action item has unknown status {raw:?}."),
	})
}

/// Snapshots the meeting as it now reads inside the transaction and appends a version row.
pub(crate) async fn record_version(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	change_summary: &str,
	now: OffsetDateTime,
) -> Result<MeetingView> {
	let view =
		load_view(&mut *conn, meeting_id).await?.ok_or_else(|| meeting_not_found(meeting_id))?;
	let snapshot = serde_json::to_value(&view)
		.map_err(|err| Error::Storage { message: format!("Failed to snapshot meeting: {err}") })?;
	let version_number = queries::next_version_number(&mut *conn, meeting_id).await?;

	queries::insert_version(
		&mut *conn,
		&MeetingVersion {
			version_id: Uuid::new_v4(),
			meeting_id,
			version_number,
			change_summary: change_summary.to_string(),
			snapshot: Json(snapshot),
			created_at: now,
		},
	)
	.await?;

	Ok(view)
}

async fn write_children(
	conn: &mut SqliteConnection,
	meeting_id: Uuid,
	valid: &ValidMeeting,
	previous: &[ActionItem],
	now: OffsetDateTime,
) -> Result<()> {
	let agenda_items: Vec<AgendaItem> = valid
		.agenda_items
		.iter()
		.enumerate()
		.map(|(position, agenda)| AgendaItem {
			agenda_item_id: Uuid::new_v4(),
			meeting_id,
			position: position as i64,
			item: agenda.item.clone(),
			notes: agenda.notes.clone(),
		})
		.collect();
	let attendees: Vec<Attendee> = valid
		.attendees
		.iter()
		.enumerate()
		.map(|(position, attendee)| Attendee {
			attendee_id: Uuid::new_v4(),
			meeting_id,
			position: position as i64,
			name: attendee.name.clone(),
			attended: attendee.attended,
		})
		.collect();
	let previous: HashMap<Uuid, &ActionItem> =
		previous.iter().map(|item| (item.action_item_id, item)).collect();
	let mut action_items = Vec::with_capacity(valid.action_items.len());

	for (position, item) in valid.action_items.iter().enumerate() {
		let before = previous.get(&item.action_item_id).copied();

		if before.is_none()
			&& queries::fetch_action_item(&mut *conn, item.action_item_id).await?.is_some()
		{
			return Err(Error::Conflict {
				message: format!(
					"Action item {} belongs to another meeting.",
					item.action_item_id
				),
			});
		}

		let prev_status = match before {
			Some(before) => stored_status(&before.status)?,
			None => ActionStatus::default(),
		};

		action_items.push(ActionItem {
			action_item_id: item.action_item_id,
			meeting_id,
			position: position as i64,
			description: item.description.clone(),
			owner: item.owner.clone(),
			due_date: item.due_date,
			status: item.status.as_str().to_string(),
			priority: item.priority.as_str().to_string(),
			project_id: before.and_then(|before| before.project_id),
			project_confidence: before.and_then(|before| before.project_confidence),
			completed_at: status::completed_at_after(
				prev_status,
				before.and_then(|before| before.completed_at),
				item.status,
				now,
			),
			created_at: before.map(|before| before.created_at).unwrap_or(now),
			updated_at: now,
		});
	}

	let edges: Vec<ActionItemDependency> = valid
		.dependencies
		.iter()
		.map(|(action_item_id, depends_on_id)| ActionItemDependency {
			action_item_id: *action_item_id,
			depends_on_id: *depends_on_id,
		})
		.collect();

	queries::replace_agenda_items(&mut *conn, meeting_id, &agenda_items).await?;
	queries::replace_attendees(&mut *conn, meeting_id, &attendees).await?;
	queries::replace_action_items(&mut *conn, meeting_id, &action_items).await?;
	queries::replace_dependencies(&mut *conn, meeting_id, &edges).await?;

	Ok(())
}

fn move_entry<T>(items: &mut Vec<T>, req: &ReorderRequest) -> Result<()> {
	reorder::move_item(items, req.from, req.to).map_err(|err| {
		let ReorderError::OutOfRange { index, .. } = err;
		let path = if index == req.from { "$.from" } else { "$.to" };

		Error::invalid_field(path, err.to_string())
	})
}

fn optional_date(raw: Option<&str>, path: &str) -> Result<Option<Date>> {
	match raw.map(str::trim) {
		None | Some("") => Ok(None),
		Some(raw) => mmp_domain::date_serde::parse_date(raw)
			.map(Some)
			.ok_or_else(|| Error::invalid_field(path, "Dates must be formatted as YYYY-MM-DD.")),
	}
}
