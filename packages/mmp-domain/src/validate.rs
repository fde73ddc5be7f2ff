//! Checks a submitted meeting and converts it into typed fields.
//!
//! Every problem is reported, each with the JSON path of the offending field.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::{
	date_serde,
	dependencies::{self, DependencyError},
	draft::{AgendaItemDraft, AttendeeDraft, MeetingDraft},
	status::{ActionStatus, Priority},
};

pub const MAX_NAME_CHARS: usize = 200;

/// A meeting as submitted by a client. Loosely typed so that bad values surface as field errors
/// instead of body rejections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingInput {
	pub project_name: String,
	pub meeting_date: String,
	pub purpose: String,
	pub agenda_items: Vec<AgendaItemDraft>,
	pub attendees: Vec<AttendeeDraft>,
	pub action_items: Vec<ActionItemInput>,
	pub notes: String,
}
impl From<MeetingDraft> for MeetingInput {
	fn from(draft: MeetingDraft) -> Self {
		Self {
			project_name: draft.project_name,
			meeting_date: draft.meeting_date.map(date_serde::format_date).unwrap_or_default(),
			purpose: draft.purpose,
			agenda_items: draft.agenda_items,
			attendees: draft.attendees,
			action_items: draft
				.action_items
				.into_iter()
				.map(|item| ActionItemInput {
					action_item_id: None,
					description: item.description,
					owner: item.owner,
					due_date: item.due_date.map(date_serde::format_date),
					status: Some(item.status.as_str().to_string()),
					priority: Some(item.priority.as_str().to_string()),
					depends_on: Vec::new(),
				})
				.collect(),
			notes: draft.notes,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionItemInput {
	/// Kept across edits; generated when absent.
	pub action_item_id: Option<Uuid>,
	pub description: String,
	pub owner: String,
	pub due_date: Option<String>,
	pub status: Option<String>,
	pub priority: Option<String>,
	/// Ids of other action items in the same submission.
	pub depends_on: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidMeeting {
	pub project_name: String,
	pub meeting_date: Date,
	pub purpose: String,
	pub agenda_items: Vec<AgendaItemDraft>,
	pub attendees: Vec<AttendeeDraft>,
	pub action_items: Vec<ValidActionItem>,
	pub notes: String,
	/// `(action_item_id, depends_on_id)` pairs.
	pub dependencies: Vec<(Uuid, Uuid)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidActionItem {
	pub action_item_id: Uuid,
	pub description: String,
	pub owner: String,
	pub due_date: Option<Date>,
	pub status: ActionStatus,
	pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
	pub path: String,
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
	pub errors: Vec<FieldError>,
}
impl ValidationError {
	pub fn fields(&self) -> Vec<String> {
		self.errors.iter().map(|error| error.path.clone()).collect()
	}
}
impl std::fmt::Display for ValidationError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let messages: Vec<&str> = self.errors.iter().map(|error| error.message.as_str()).collect();

		f.write_str(&messages.join(" "))
	}
}

#[derive(Default)]
struct Collector {
	errors: Vec<FieldError>,
}
impl Collector {
	fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
		self.errors.push(FieldError { path: path.into(), message: message.into() });
	}
}

pub fn meeting(input: &MeetingInput) -> Result<ValidMeeting, ValidationError> {
	let mut collector = Collector::default();
	let project_name = input.project_name.trim();

	if project_name.is_empty() {
		collector.push("$.project_name", "project_name is required.");
	} else if project_name.chars().count() > MAX_NAME_CHARS {
		collector.push(
			"$.project_name",
			format!("project_name must be at most {MAX_NAME_CHARS} characters."),
		);
	}

	let meeting_date = match input.meeting_date.trim() {
		"" => {
			collector.push("$.meeting_date", "meeting_date is required.");

			None
		},
		raw => {
			let parsed = date_serde::parse_date(raw);

			if parsed.is_none() {
				collector.push("$.meeting_date", "meeting_date must be formatted as YYYY-MM-DD.");
			}

			parsed
		},
	};

	for (idx, agenda) in input.agenda_items.iter().enumerate() {
		if agenda.item.trim().is_empty() {
			collector.push(format!("$.agenda_items[{idx}].item"), "Agenda item text is required.");
		}
	}
	for (idx, attendee) in input.attendees.iter().enumerate() {
		if attendee.name.trim().is_empty() {
			collector.push(format!("$.attendees[{idx}].name"), "Attendee name is required.");
		}
	}

	let action_items = action_items(&input.action_items, &mut collector);
	let dependencies = dependency_edges(&input.action_items, &action_items, &mut collector);

	match meeting_date {
		Some(meeting_date) if collector.errors.is_empty() => Ok(ValidMeeting {
			project_name: project_name.to_string(),
			meeting_date,
			purpose: input.purpose.trim().to_string(),
			agenda_items: input
				.agenda_items
				.iter()
				.map(|agenda| AgendaItemDraft {
					item: agenda.item.trim().to_string(),
					notes: agenda.notes.trim().to_string(),
				})
				.collect(),
			attendees: input
				.attendees
				.iter()
				.map(|attendee| AttendeeDraft {
					name: attendee.name.trim().to_string(),
					attended: attendee.attended,
				})
				.collect(),
			action_items,
			notes: input.notes.trim().to_string(),
			dependencies,
		}),
		_ => Err(ValidationError { errors: collector.errors }),
	}
}

pub fn status(raw: &str, path: &str) -> Result<ActionStatus, FieldError> {
	ActionStatus::parse(raw.trim()).ok_or_else(|| FieldError {
		path: path.to_string(),
		message: format!(
			"status must be one of {}.",
			ActionStatus::ALL.map(ActionStatus::as_str).join(", ")
		),
	})
}

pub fn priority(raw: &str, path: &str) -> Result<Priority, FieldError> {
	Priority::parse(raw).ok_or_else(|| FieldError {
		path: path.to_string(),
		message: "priority must be one of low, medium, high.".to_string(),
	})
}

/// Blank input means no due date.
pub fn due_date(raw: Option<&str>, path: &str) -> Result<Option<Date>, FieldError> {
	match raw.map(str::trim) {
		None | Some("") => Ok(None),
		Some(raw) => date_serde::parse_date(raw).map(Some).ok_or_else(|| FieldError {
			path: path.to_string(),
			message: "due_date must be formatted as YYYY-MM-DD.".to_string(),
		}),
	}
}

fn action_items(inputs: &[ActionItemInput], collector: &mut Collector) -> Vec<ValidActionItem> {
	let mut seen = HashSet::new();
	let mut items = Vec::with_capacity(inputs.len());

	for (idx, input) in inputs.iter().enumerate() {
		let base = format!("$.action_items[{idx}]");

		if input.description.trim().is_empty() {
			collector.push(format!("{base}.description"), "Action item description is required.");
		}

		let action_item_id = input.action_item_id.unwrap_or_else(Uuid::new_v4);

		if !seen.insert(action_item_id) {
			collector.push(
				format!("{base}.action_item_id"),
				format!("Action item {action_item_id} is listed more than once."),
			);
		}

		let status = match input.status.as_deref() {
			Some(raw) => status(raw, &format!("{base}.status")).unwrap_or_else(|err| {
				collector.errors.push(err);

				ActionStatus::default()
			}),
			None => ActionStatus::default(),
		};
		let priority = match input.priority.as_deref() {
			Some(raw) => priority(raw, &format!("{base}.priority")).unwrap_or_else(|err| {
				collector.errors.push(err);

				Priority::default()
			}),
			None => Priority::default(),
		};
		let due_date = due_date(input.due_date.as_deref(), &format!("{base}.due_date"))
			.unwrap_or_else(|err| {
				collector.errors.push(err);

				None
			});

		items.push(ValidActionItem {
			action_item_id,
			description: input.description.trim().to_string(),
			owner: input.owner.trim().to_string(),
			due_date,
			status,
			priority,
		});
	}

	items
}

fn dependency_edges(
	inputs: &[ActionItemInput],
	items: &[ValidActionItem],
	collector: &mut Collector,
) -> Vec<(Uuid, Uuid)> {
	let ids: Vec<Uuid> = items.iter().map(|item| item.action_item_id).collect();
	let mut edges = Vec::new();

	for (idx, (input, item)) in inputs.iter().zip(items).enumerate() {
		for depends_on in &input.depends_on {
			edges.push((item.action_item_id, *depends_on));

			let single = [(item.action_item_id, *depends_on)];

			if let Err(err) = dependencies::validate(&ids, &single)
				&& err != DependencyError::Cycle
			{
				collector.push(format!("$.action_items[{idx}].depends_on"), err.to_string());
			}
		}
	}

	if collector.errors.iter().all(|error| !error.path.ends_with(".depends_on"))
		&& let Err(err) = dependencies::validate(&ids, &edges)
	{
		collector.push("$.action_items", err.to_string());
	}

	edges
}
