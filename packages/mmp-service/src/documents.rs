use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MeetingService, MeetingView, Result};
use mmp_docx::{ActionRow, AgendaRow, AttendeeRow, Minutes};
use mmp_domain::{
	clipboard, date_serde,
	draft::{ActionItemDraft, AgendaItemDraft, AttendeeDraft, MeetingDraft},
	status::ActionStatus,
};

#[derive(Debug, Clone)]
pub struct ExportedDocument {
	pub file_name: String,
	pub content_type: &'static str,
	/// Quoted blake3 hex digest of `bytes`.
	pub etag: String,
	pub bytes: Vec<u8>,
}

impl MeetingService {
	pub async fn export_docx(&self, meeting_id: Uuid) -> Result<ExportedDocument> {
		let view = self.get_meeting(meeting_id).await?;
		let bytes = mmp_docx::render(&minutes(&view))?;
		let etag = format!("\"{}\"", blake3::hash(&bytes).to_hex());
		let file_name = format!(
			"{}_{}_{}.docx",
			self.cfg.export.file_prefix,
			file_name_part(&view.project_name),
			date_serde::format_date(view.meeting_date)
		);

		tracing::info!(%meeting_id, bytes = bytes.len(), %etag, "Meeting exported.");

		Ok(ExportedDocument { file_name, content_type: mmp_docx::CONTENT_TYPE, etag, bytes })
	}

	/// Reads a document in the export layout back into a draft. Nothing is stored.
	pub fn import_docx(&self, bytes: &[u8]) -> Result<MeetingDraft> {
		let minutes = mmp_docx::parse_minutes(bytes).map_err(|err| {
			Error::invalid_field("$.file", format!("Not a meeting minutes document: {err}"))
		})?;
		let meeting_date = date_serde::parse_date(&minutes.meeting_date);

		Ok(MeetingDraft {
			project_name: minutes.project_name,
			meeting_date,
			purpose: minutes.purpose,
			agenda_items: minutes
				.agenda
				.into_iter()
				.map(|row| AgendaItemDraft { item: row.item, notes: row.notes })
				.collect(),
			attendees: minutes
				.attendees
				.into_iter()
				.map(|row| AttendeeDraft { name: row.name, attended: row.attended })
				.collect(),
			action_items: minutes
				.action_items
				.into_iter()
				.map(|row| ActionItemDraft {
					due_date: date_serde::parse_date(&row.due_date),
					status: ActionStatus::parse_loose(&row.status).unwrap_or_default(),
					description: row.description,
					owner: row.owner,
					..Default::default()
				})
				.collect(),
			notes: String::new(),
		})
	}

	/// Relative due dates resolve against today when the text has no `Date:` line.
	pub fn parse_clipboard(&self, text: &str) -> MeetingDraft {
		clipboard::parse(text, Some(OffsetDateTime::now_utc().date()))
	}
}

pub(crate) fn minutes(view: &MeetingView) -> Minutes {
	Minutes {
		project_name: view.project_name.clone(),
		meeting_date: date_serde::format_date(view.meeting_date),
		purpose: view.purpose.clone(),
		agenda: view
			.agenda_items
			.iter()
			.map(|agenda| AgendaRow { item: agenda.item.clone(), notes: agenda.notes.clone() })
			.collect(),
		attendees: view
			.attendees
			.iter()
			.map(|attendee| AttendeeRow {
				name: attendee.name.clone(),
				attended: attendee.attended,
			})
			.collect(),
		action_items: view
			.action_items
			.iter()
			.map(|item| ActionRow {
				description: item.description.clone(),
				owner: item.owner.clone(),
				due_date: item.due_date.map(date_serde::format_date).unwrap_or_default(),
				status: item.status.as_str().to_string(),
			})
			.collect(),
	}
}

/// Keeps ASCII letters, digits, `-` and `_`; everything else becomes `_`.
fn file_name_part(text: &str) -> String {
	let cleaned: String = text
		.trim()
		.chars()
		.map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
		.collect();

	if cleaned.is_empty() { "meeting".to_string() } else { cleaned }
}
