use serde_json::Value;
use sqlx::types::Json;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Meeting {
	pub meeting_id: Uuid,
	pub project_name: String,
	pub meeting_date: Date,
	pub purpose: String,
	pub notes: String,
	pub summary: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgendaItem {
	pub agenda_item_id: Uuid,
	pub meeting_id: Uuid,
	pub position: i64,
	pub item: String,
	pub notes: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Attendee {
	pub attendee_id: Uuid,
	pub meeting_id: Uuid,
	pub position: i64,
	pub name: String,
	pub attended: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionItem {
	pub action_item_id: Uuid,
	pub meeting_id: Uuid,
	pub position: i64,
	pub description: String,
	pub owner: String,
	pub due_date: Option<Date>,
	/// One of `Pending`, `In Progress`, `Completed`, `Blocked`; enforced by a CHECK constraint.
	pub status: String,
	pub priority: String,
	pub project_id: Option<Uuid>,
	pub project_confidence: Option<f32>,
	pub completed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ActionItemDependency {
	pub action_item_id: Uuid,
	pub depends_on_id: Uuid,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
	pub project_id: Uuid,
	pub name: String,
	pub description: String,
	pub keywords: Json<Vec<String>>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetingProject {
	pub meeting_id: Uuid,
	pub project_id: Uuid,
	pub confidence: f32,
	pub is_primary: bool,
	/// `keyword` or `model`.
	pub method: String,
	pub keywords_matched: Json<Vec<String>>,
	pub reasoning: String,
	pub classified_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetingVersion {
	pub version_id: Uuid,
	pub meeting_id: Uuid,
	pub version_number: i64,
	pub change_summary: String,
	pub snapshot: Json<Value>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Screenshot {
	pub screenshot_id: Uuid,
	pub original_name: String,
	pub stored_path: String,
	pub content_type: String,
	pub size_bytes: i64,
	pub created_at: OffsetDateTime,
}
