//! Prompt construction around the provider chain, and parsing of the answers into draft shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AudioUpload, Error, MeetingService, MeetingView, Result, meetings};
use mmp_domain::{
	classifier,
	draft::{self, ActionItemDraft, MeetingDraft},
};
use mmp_providers::{
	chat::{ChatRequest, ContentPart},
	json,
};
use mmp_storage::queries;

pub(crate) const MEETING_JSON_SHAPE: &str = r#"{
  "project_name": "string",
  "meeting_date": "YYYY-MM-DD",
  "meeting_purpose": "string",
  "agenda_items": [{ "item": "string", "notes": "string" }],
  "attendees": [{ "name": "string", "attended": true }],
  "action_items": [{
    "description": "string",
    "owner": "string",
    "due_date": "YYYY-MM-DD or empty",
    "status": "Pending | In Progress | Completed | Blocked",
    "priority": "low | medium | high"
  }],
  "notes": "string"
}"#;
const GENERATE_SYSTEM_PROMPT: &str = "\
You turn raw meeting notes, transcripts, and screenshots into structured meeting minutes. Reply \
with one JSON object only, no commentary. Use empty strings or empty arrays for anything the input \
does not mention. Never invent attendees or dates.";
const SUMMARY_SYSTEM_PROMPT: &str = "\
You write concise executive summaries of meeting minutes: three to five sentences covering the \
purpose, key decisions, and the most important follow-ups. Reply with plain text only.";
const ACTION_ITEMS_SYSTEM_PROMPT: &str = "\
You extract action items from meeting text. Reply with a JSON array only. Each element is an \
object with description, owner (empty if unknown), due_date (YYYY-MM-DD or empty), status \
(Pending, In Progress, Completed, or Blocked), and priority (low, medium, or high).";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiGenerateRequest {
	#[serde(default)]
	pub meeting_notes: String,
	/// Previously uploaded screenshots to include as images.
	#[serde(default)]
	pub screenshot_ids: Vec<Uuid>,
	pub additional_context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionResponse {
	pub provider_id: String,
	pub text: String,
	pub word_count: usize,
}

impl MeetingService {
	/// Drafts a meeting from notes and screenshots. Nothing is stored.
	pub async fn ai_generate(&self, req: AiGenerateRequest) -> Result<MeetingDraft> {
		let notes = req.meeting_notes.trim();

		if notes.is_empty() && req.screenshot_ids.is_empty() {
			return Err(Error::invalid_field(
				"$.meeting_notes",
				"meeting_notes or screenshot_ids is required.",
			));
		}

		let mut prompt =
			format!("Produce meeting minutes in this JSON shape:\n{MEETING_JSON_SHAPE}\n");

		if let Some(context) = req.additional_context.as_deref().map(str::trim)
			&& !context.is_empty()
		{
			prompt.push_str(&format!("\nAdditional context:\n{context}\n"));
		}
		if !notes.is_empty() {
			let notes =
				classifier::truncate_words(notes, self.cfg.classifier.transcript_word_limit as usize);

			prompt.push_str(&format!("\nMeeting notes:\n{notes}\n"));
		}

		let mut parts = vec![ContentPart::Text(prompt)];

		for (idx, screenshot_id) in req.screenshot_ids.iter().enumerate() {
			let path = format!("$.screenshot_ids[{idx}]");

			parts.push(self.screenshot_part(*screenshot_id, &path).await?);
		}

		let request = ChatRequest { system: GENERATE_SYSTEM_PROMPT.to_string(), parts };
		let content = self.complete_with_failover("generate", &request).await?;
		let value = model_json(&content)?;

		Ok(draft::from_model(&value, Some(OffsetDateTime::now_utc().date())))
	}

	/// Stores a model-written summary on the meeting and records a version.
	pub async fn summarize_meeting(&self, meeting_id: Uuid) -> Result<MeetingView> {
		let view = self.get_meeting(meeting_id).await?;
		let text = classifier::truncate_words(
			&crate::classify::meeting_text(&view),
			self.cfg.classifier.transcript_word_limit as usize,
		);
		let request = ChatRequest::text(SUMMARY_SYSTEM_PROMPT, text);
		let summary = self.complete_with_failover("summarize", &request).await?.trim().to_string();
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut meeting) = queries::fetch_meeting(&mut *tx, meeting_id).await? else {
			return Err(meetings::meeting_not_found(meeting_id));
		};

		meeting.summary = Some(summary);
		meeting.updated_at = now;

		queries::update_meeting(&mut tx, &meeting).await?;

		let view = meetings::record_version(&mut tx, meeting_id, "Summarized.", now).await?;

		tx.commit().await?;

		tracing::info!(%meeting_id, "Meeting summarized.");

		Ok(view)
	}

	pub async fn extract_action_items(&self, text: &str) -> Result<Vec<ActionItemDraft>> {
		let text = text.trim();

		if text.is_empty() {
			return Err(Error::invalid_field("$.text", "text is required."));
		}

		let request = ChatRequest::text(
			ACTION_ITEMS_SYSTEM_PROMPT,
			classifier::truncate_words(text, self.cfg.classifier.transcript_word_limit as usize),
		);
		let content = self.complete_with_failover("action_items", &request).await?;
		let value = model_json(&content)?;

		Ok(draft::action_items_from_model(&value, Some(OffsetDateTime::now_utc().date())))
	}

	pub async fn transcribe(&self, audio: AudioUpload) -> Result<TranscriptionResponse> {
		if audio.bytes.is_empty() {
			return Err(Error::invalid_field("$.file", "Audio file is empty."));
		}
		if audio.bytes.len() as u64 > self.cfg.storage.max_upload_bytes {
			return Err(Error::invalid_field(
				"$.file",
				format!("Audio file exceeds {} bytes.", self.cfg.storage.max_upload_bytes),
			));
		}

		let Some(provider) = self.cfg.providers.transcription.as_ref() else {
			return Err(Error::Provider {
				message: "No transcription provider is configured.".to_string(),
			});
		};

		match self.providers.transcription.transcribe(provider, &audio).await {
			Ok(text) => {
				self.record(&provider.provider_id, None);
				tracing::info!(
					provider_id = %provider.provider_id,
					bytes = audio.bytes.len(),
					"Audio transcribed."
				);

				Ok(TranscriptionResponse {
					provider_id: provider.provider_id.clone(),
					word_count: text.split_whitespace().count(),
					text,
				})
			},
			Err(err) => {
				let message = err.to_string();

				tracing::warn!(
					provider_id = %provider.provider_id,
					error = %message,
					"Transcription failed."
				);
				self.record(&provider.provider_id, Some(&message));

				Err(err)
			},
		}
	}
}

/// The first JSON value in a model answer.
pub(crate) fn model_json(content: &str) -> Result<Value> {
	json::extract_json(content).map_err(|err| Error::Provider {
		message: format!("Model answer did not contain usable JSON: {err}"),
	})
}
