use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MeetingService, Result, ai};
use mmp_domain::draft::{self, AttendeeDraft, MeetingDraft};
use mmp_providers::chat::{ChatRequest, ContentPart};
use mmp_storage::{models::Screenshot, queries};

const ANALYZE_SYSTEM_PROMPT: &str = "\
You read screenshots of meeting notes, whiteboards, slides, and chat threads and turn them into \
structured meeting minutes. Reply with one JSON object only. Use empty strings or empty arrays for \
anything the image does not show.";
const SPEAKERS_SYSTEM_PROMPT: &str = "\
You list the people visible or named in screenshots of video calls, chat threads, and meeting \
notes. Reply with one JSON object only: {\"speakers\": [\"Full Name\", ...]}. Use an empty \
array when nobody can be identified. Never invent names.";
const IMAGE_TYPES: [(&str, &str); 4] =
	[("image/png", "png"), ("image/jpeg", "jpg"), ("image/gif", "gif"), ("image/webp", "webp")];

#[derive(Debug, Clone)]
pub struct ScreenshotUpload {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotView {
	pub screenshot_id: Uuid,
	pub original_name: String,
	pub content_type: String,
	pub size_bytes: i64,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub created_at: OffsetDateTime,
}
impl From<Screenshot> for ScreenshotView {
	fn from(screenshot: Screenshot) -> Self {
		Self {
			screenshot_id: screenshot.screenshot_id,
			original_name: screenshot.original_name,
			content_type: screenshot.content_type,
			size_bytes: screenshot.size_bytes,
			created_at: screenshot.created_at,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeScreenshotRequest {
	pub screenshot_id: Uuid,
	pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentifySpeakersRequest {
	pub screenshot_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeakerIdentification {
	pub screenshot_id: Uuid,
	pub speakers: Vec<String>,
	/// Ready to merge into a meeting's attendee list.
	pub attendees: Vec<AttendeeDraft>,
}

impl MeetingService {
	/// Stores the image under `storage.uploads_dir` with a generated name.
	pub async fn upload_screenshot(&self, upload: ScreenshotUpload) -> Result<ScreenshotView> {
		let content_type = upload.content_type.trim().to_ascii_lowercase();
		let Some((_, extension)) = IMAGE_TYPES.iter().find(|(mime, _)| *mime == content_type) else {
			return Err(Error::invalid_field(
				"$.file",
				format!("Unsupported image type {content_type:?}. Use PNG, JPEG, GIF, or WebP."),
			));
		};

		if upload.bytes.is_empty() {
			return Err(Error::invalid_field("$.file", "Image file is empty."));
		}
		if upload.bytes.len() as u64 > self.cfg.storage.max_upload_bytes {
			return Err(Error::invalid_field(
				"$.file",
				format!("Image file exceeds {} bytes.", self.cfg.storage.max_upload_bytes),
			));
		}

		let screenshot_id = Uuid::new_v4();
		let dir = Path::new(&self.cfg.storage.uploads_dir);
		let stored_path: PathBuf = dir.join(format!("{screenshot_id}.{extension}"));

		tokio::fs::create_dir_all(dir).await.map_err(|err| Error::Storage {
			message: format!("Failed to create uploads directory: {err}"),
		})?;
		tokio::fs::write(&stored_path, &upload.bytes).await.map_err(|err| Error::Storage {
			message: format!("Failed to store screenshot: {err}"),
		})?;

		let original_name = Path::new(upload.file_name.trim())
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_else(|| format!("{screenshot_id}.{extension}"));
		let screenshot = Screenshot {
			screenshot_id,
			original_name,
			stored_path: stored_path.to_string_lossy().into_owned(),
			content_type,
			size_bytes: upload.bytes.len() as i64,
			created_at: OffsetDateTime::now_utc(),
		};

		if let Err(err) = queries::insert_screenshot(&self.db.pool, &screenshot).await {
			if let Err(remove_err) = tokio::fs::remove_file(&stored_path).await {
				tracing::warn!(
					%screenshot_id,
					error = %remove_err,
					"Failed to remove screenshot after insert failure."
				);
			}

			return Err(err.into());
		}

		tracing::info!(%screenshot_id, size_bytes = screenshot.size_bytes, "Screenshot stored.");

		Ok(screenshot.into())
	}

	/// Reads meeting fields off a stored screenshot with a vision-capable model.
	pub async fn analyze_screenshot(&self, req: AnalyzeScreenshotRequest) -> Result<MeetingDraft> {
		let image = self.screenshot_part(req.screenshot_id, "$.screenshot_id").await?;
		let mut prompt =
			format!("Produce meeting minutes in this JSON shape:\n{}\n", ai::MEETING_JSON_SHAPE);

		if let Some(context) = req.context.as_deref().map(str::trim)
			&& !context.is_empty()
		{
			prompt.push_str(&format!("\nContext from the user:\n{context}\n"));
		}

		let request = ChatRequest {
			system: ANALYZE_SYSTEM_PROMPT.to_string(),
			parts: vec![ContentPart::Text(prompt), image],
		};
		let content = self.complete_with_failover("analyze_screenshot", &request).await?;
		let value = ai::model_json(&content)?;

		Ok(draft::from_model(&value, Some(OffsetDateTime::now_utc().date())))
	}

	/// Asks a vision-capable model who appears in a stored screenshot.
	pub async fn identify_speakers(
		&self,
		req: IdentifySpeakersRequest,
	) -> Result<SpeakerIdentification> {
		let image = self.screenshot_part(req.screenshot_id, "$.screenshot_id").await?;
		let request = ChatRequest {
			system: SPEAKERS_SYSTEM_PROMPT.to_string(),
			parts: vec![ContentPart::Text("Who takes part in this meeting?".to_string()), image],
		};
		let content = self.complete_with_failover("identify_speakers", &request).await?;
		let value = ai::model_json(&content)?;
		let attendees = draft::speakers_from_model(&value);

		tracing::info!(
			screenshot_id = %req.screenshot_id,
			speakers = attendees.len(),
			"Speakers identified."
		);

		Ok(SpeakerIdentification {
			screenshot_id: req.screenshot_id,
			speakers: attendees.iter().map(|attendee| attendee.name.clone()).collect(),
			attendees,
		})
	}

	/// `path` names the request field that referenced the screenshot.
	pub(crate) async fn screenshot_part(
		&self,
		screenshot_id: Uuid,
		path: &str,
	) -> Result<ContentPart> {
		let Some(screenshot) = queries::fetch_screenshot(&self.db.pool, screenshot_id).await? else {
			return Err(Error::NotFound {
				message: format!("Screenshot {screenshot_id} referenced by {path} does not exist."),
			});
		};
		let bytes = tokio::fs::read(&screenshot.stored_path).await.map_err(|err| Error::Storage {
			message: format!("Failed to read screenshot {screenshot_id}: {err}"),
		})?;

		Ok(ContentPart::Image { media_type: screenshot.content_type, data: STANDARD.encode(bytes) })
	}
}
