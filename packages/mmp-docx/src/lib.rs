//! Word (DOCX) rendering of meeting minutes in a fixed five-table layout, and the reverse.
//!
//! Tables, in order:
//! 1. Project / Date
//! 2. Meeting Purpose
//! 3. Agenda Item / Notes
//! 4. Attendee / Present / Attendee / Present, two attendees per row
//! 5. Description / Owner / Due Date / Status

pub mod reader;
pub mod writer;

mod error;

pub use error::{Error, Result};
pub use reader::{parse_minutes, read_tables};
pub use writer::render;

pub const CONTENT_TYPE: &str =
	"application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// Cell text for an attendee who was present.
pub const PRESENT_MARK: &str = "✓";
pub const TABLE_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Minutes {
	pub project_name: String,
	/// Already formatted, e.g. `2025-03-12`.
	pub meeting_date: String,
	pub purpose: String,
	pub agenda: Vec<AgendaRow>,
	pub attendees: Vec<AttendeeRow>,
	pub action_items: Vec<ActionRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendaRow {
	pub item: String,
	pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendeeRow {
	pub name: String,
	pub attended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRow {
	pub description: String,
	pub owner: String,
	/// Empty when the item has no due date.
	pub due_date: String,
	pub status: String,
}
