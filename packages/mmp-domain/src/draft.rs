//! Unsaved meeting fields produced by the clipboard parser, DOCX import, or a model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::{
	classifier, date_serde,
	status::{ActionStatus, Priority},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingDraft {
	pub project_name: String,
	#[serde(with = "crate::date_serde::option")]
	pub meeting_date: Option<Date>,
	pub purpose: String,
	pub agenda_items: Vec<AgendaItemDraft>,
	pub attendees: Vec<AttendeeDraft>,
	pub action_items: Vec<ActionItemDraft>,
	pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgendaItemDraft {
	pub item: String,
	pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeDraft {
	pub name: String,
	#[serde(default = "default_attended")]
	pub attended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionItemDraft {
	pub description: String,
	pub owner: String,
	#[serde(with = "crate::date_serde::option")]
	pub due_date: Option<Date>,
	pub status: ActionStatus,
	pub priority: Priority,
}

/// Reads a model's meeting object leniently: alternate key spellings are accepted, list entries
/// may be plain strings, and values that do not parse are dropped rather than failing the draft.
/// `reference` resolves relative due dates when the model gives no meeting date.
pub fn from_model(value: &Value, reference: Option<Date>) -> MeetingDraft {
	let meeting_date = first_str(value, &["meeting_date", "date"]).and_then(date_serde::parse_date);
	let reference = meeting_date.or(reference);

	MeetingDraft {
		project_name: first_str(value, &["project_name", "project"]).unwrap_or_default().to_string(),
		meeting_date,
		purpose: first_str(value, &["meeting_purpose", "purpose"]).unwrap_or_default().to_string(),
		agenda_items: list(value, &["agenda_items", "agenda"])
			.iter()
			.filter_map(|entry| match entry {
				Value::String(item) =>
					Some(AgendaItemDraft { item: item.trim().to_string(), notes: String::new() }),
				_ => Some(AgendaItemDraft {
					item: first_str(entry, &["item", "topic", "title"])?.to_string(),
					notes: first_str(entry, &["notes", "discussion"]).unwrap_or_default().to_string(),
				}),
			})
			.filter(|agenda| !agenda.item.is_empty())
			.collect(),
		attendees: list(value, &["attendees", "participants"])
			.iter()
			.filter_map(attendee_from_model)
			.collect(),
		action_items: action_items_from_model(
			value.get("action_items").unwrap_or(&Value::Null),
			reference,
		),
		notes: first_str(value, &["notes", "additional_notes"]).unwrap_or_default().to_string(),
	}
}

/// Accepts either a bare array or an object holding `action_items`.
pub fn action_items_from_model(value: &Value, reference: Option<Date>) -> Vec<ActionItemDraft> {
	let entries: &[Value] = match value {
		Value::Array(entries) => entries.as_slice(),
		Value::Object(_) => list(value, &["action_items", "tasks"]),
		_ => &[],
	};

	entries
		.iter()
		.filter_map(|entry| {
			let description = match entry {
				Value::String(text) => text.trim(),
				_ => first_str(entry, &["description", "task", "title"])?,
			};

			if description.is_empty() {
				return None;
			}

			let owner = first_str(entry, &["owner", "assignee", "assigned_to"])
				.map(str::to_string)
				.or_else(|| classifier::extract_assignee(description))
				.unwrap_or_default();
			let due_date = first_str(entry, &["due_date", "deadline"])
				.and_then(date_serde::parse_date)
				.or_else(|| classifier::extract_due_date(description, reference));

			Some(ActionItemDraft {
				description: description.to_string(),
				owner,
				due_date,
				status: first_str(entry, &["status"])
					.and_then(ActionStatus::parse_loose)
					.unwrap_or_default(),
				priority: first_str(entry, &["priority"]).and_then(Priority::parse).unwrap_or_default(),
			})
		})
		.collect()
}

/// Reads the people a model saw in a screenshot, as attendee suggestions. Accepts a bare array
/// or an object holding `speakers`, `participants`, or `attendees`. Names are deduplicated
/// case-insensitively, first spelling wins.
pub fn speakers_from_model(value: &Value) -> Vec<AttendeeDraft> {
	let entries: &[Value] = match value {
		Value::Array(entries) => entries.as_slice(),
		Value::Object(_) => list(value, &["speakers", "participants", "attendees"]),
		_ => &[],
	};
	let mut seen = HashSet::new();

	entries
		.iter()
		.filter_map(attendee_from_model)
		.filter(|attendee| seen.insert(attendee.name.to_lowercase()))
		.collect()
}

fn attendee_from_model(entry: &Value) -> Option<AttendeeDraft> {
	let attendee = match entry {
		Value::String(name) => AttendeeDraft { name: name.trim().to_string(), attended: true },
		_ => AttendeeDraft {
			name: first_str(entry, &["name", "speaker"])?.to_string(),
			attended: entry.get("attended").and_then(Value::as_bool).unwrap_or(true),
		},
	};

	(!attendee.name.is_empty()).then_some(attendee)
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
	keys.iter()
		.filter_map(|key| value.get(*key).and_then(Value::as_str))
		.map(str::trim)
		.find(|text| !text.is_empty())
}

fn list<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
	keys.iter()
		.find_map(|key| value.get(*key).and_then(Value::as_array))
		.map(Vec::as_slice)
		.unwrap_or_default()
}

fn default_attended() -> bool {
	true
}
