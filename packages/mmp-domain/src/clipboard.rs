//! Buckets pasted free text into meeting fields by header lines and bullet markers.
//!
//! Best effort only: unrecognized structure lands in the purpose, never in an error.

use time::Date;

use crate::{
	classifier,
	draft::{ActionItemDraft, AgendaItemDraft, AttendeeDraft, MeetingDraft},
	status::ActionStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
	Purpose,
	Agenda,
	Attendees,
	ActionItems,
	Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
	Project,
	Date,
	Section(Section),
}

struct PendingAction {
	text: String,
	checked: Option<bool>,
}

/// `reference` resolves relative due dates ("by Friday") when the text carries no `Date:` line.
pub fn parse(text: &str, reference: Option<Date>) -> MeetingDraft {
	let mut draft = MeetingDraft::default();
	let mut section = Section::Purpose;
	let mut purpose = Vec::new();
	let mut notes = Vec::new();
	let mut actions = Vec::new();

	for raw_line in text.lines() {
		let line = raw_line.trim();

		if line.is_empty() {
			continue;
		}

		let body = match match_header(line) {
			Some((Header::Project, inline)) => {
				if !inline.is_empty() {
					draft.project_name = inline.to_string();
				}

				continue;
			},
			Some((Header::Date, inline)) => {
				if let Some(date) = crate::date_serde::parse_date(inline) {
					draft.meeting_date = Some(date);
				}

				continue;
			},
			Some((Header::Section(next), inline)) => {
				section = next;

				if inline.is_empty() {
					continue;
				}

				inline
			},
			None => line,
		};
		let (body, checked) = strip_checkbox(strip_bullet(body));

		if body.is_empty() {
			continue;
		}

		match section {
			Section::Purpose => purpose.push(body.to_string()),
			Section::Notes => notes.push(body.to_string()),
			Section::Agenda => draft.agenda_items.push(agenda_item(body)),
			Section::Attendees => draft.attendees.extend(attendees(body, checked)),
			Section::ActionItems => actions.push(PendingAction { text: body.to_string(), checked }),
		}
	}

	let reference = draft.meeting_date.or(reference);

	draft.action_items = actions.into_iter().map(|pending| action_item(pending, reference)).collect();
	draft.purpose = purpose.join("\n");
	draft.notes = notes.join("\n");

	draft
}

fn match_header(line: &str) -> Option<(Header, &str)> {
	let unmarked = line.trim_start_matches('#').trim().trim_matches('*').trim();
	let (head, inline) = match unmarked.split_once(':') {
		Some((head, inline)) => (head, inline.trim().trim_start_matches('*').trim()),
		None => (unmarked, ""),
	};
	let head = head.trim().trim_matches('*').trim().to_lowercase();
	let header = match head.as_str() {
		"project" | "project name" => Header::Project,
		"date" | "meeting date" => Header::Date,
		"purpose" | "meeting purpose" | "objective" | "objectives" | "goal" | "goals" =>
			Header::Section(Section::Purpose),
		"agenda" | "agenda items" | "topics" | "discussion" | "discussion points" =>
			Header::Section(Section::Agenda),
		"attendees" | "participants" | "present" | "attendance" =>
			Header::Section(Section::Attendees),
		"action items" | "action item" | "actions" | "action" | "next steps" | "todo"
		| "to do" | "to-do" | "tasks" => Header::Section(Section::ActionItems),
		"notes" | "meeting notes" | "additional notes" => Header::Section(Section::Notes),
		_ => return None,
	};

	Some((header, inline))
}

fn strip_bullet(line: &str) -> &str {
	let trimmed = line.trim_start();

	for marker in ['-', '*', '+', '•'] {
		if let Some(rest) = trimmed.strip_prefix(marker)
			&& (rest.is_empty() || rest.starts_with(char::is_whitespace))
		{
			return rest.trim_start();
		}
	}

	let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();

	if digits > 0
		&& let Some(rest) = trimmed[digits..].strip_prefix(['.', ')'])
		&& rest.starts_with(char::is_whitespace)
	{
		return rest.trim_start();
	}

	trimmed
}

fn strip_checkbox(line: &str) -> (&str, Option<bool>) {
	for (marker, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
		if let Some(rest) = line.strip_prefix(marker) {
			return (rest.trim_start(), Some(checked));
		}
	}

	(line, None)
}

fn agenda_item(body: &str) -> AgendaItemDraft {
	match body.split_once(": ").or_else(|| body.split_once(" - ")) {
		Some((item, notes)) =>
			AgendaItemDraft { item: item.trim().to_string(), notes: notes.trim().to_string() },
		None => AgendaItemDraft { item: body.to_string(), notes: String::new() },
	}
}

fn attendees(body: &str, checked: Option<bool>) -> Vec<AttendeeDraft> {
	body.split([',', ';'])
		.filter_map(|part| {
			let part = part.trim();
			let (name, absent) = if let Some(name) = strip_suffix_ignore_case(part, "(absent)") {
				(name.trim(), true)
			} else if let Some(name) = strip_suffix_ignore_case(part, "(present)") {
				(name.trim(), false)
			} else {
				(part, false)
			};

			if name.is_empty() {
				return None;
			}

			Some(AttendeeDraft {
				name: name.to_string(),
				attended: !absent && checked.unwrap_or(true),
			})
		})
		.collect()
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
	let start = text.len().checked_sub(suffix.len())?;
	let tail = text.get(start..)?;

	tail.eq_ignore_ascii_case(suffix).then(|| &text[..start])
}

fn action_item(pending: PendingAction, reference: Option<Date>) -> ActionItemDraft {
	let status = match pending.checked {
		Some(true) => ActionStatus::Completed,
		_ => ActionStatus::Pending,
	};

	ActionItemDraft {
		owner: classifier::extract_assignee(&pending.text).unwrap_or_default(),
		due_date: classifier::extract_due_date(&pending.text, reference),
		description: pending.text,
		status,
		..Default::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bullets_and_checkboxes_are_stripped() {
		assert_eq!(strip_bullet("- item"), "item");
		assert_eq!(strip_bullet("• item"), "item");
		assert_eq!(strip_bullet("12) item"), "item");
		assert_eq!(strip_bullet("3. item"), "item");
		assert_eq!(strip_bullet("3.5 percent"), "3.5 percent");
		assert_eq!(strip_bullet("-5 degrees"), "-5 degrees");
		assert_eq!(strip_checkbox("[x] done"), ("done", Some(true)));
	}

	#[test]
	fn header_with_inline_content() {
		assert_eq!(
			match_header("## Attendees: Ann, Bob"),
			Some((Header::Section(Section::Attendees), "Ann, Bob"))
		);
		assert_eq!(match_header("**Action Items:**"), Some((Header::Section(Section::ActionItems), "")));
		assert_eq!(match_header("Budget: approved"), None);
	}
}
