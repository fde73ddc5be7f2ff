use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{MeetingService, ProjectMatchView, Result, meetings};
use mmp_domain::classifier::{self, ProjectMatch, ProjectProfile};
use mmp_providers::{chat::ChatRequest, json};
use mmp_storage::{models::MeetingProject, queries};

const CLASSIFY_SYSTEM_PROMPT: &str = "\
You assign meeting minutes to the projects they concern. Reply with a JSON array only. Each \
element is an object with project_id (copied from the list), confidence (0.0 to 1.0), \
keywords_matched (array of strings), and reasoning (one sentence). Leave out unrelated projects.";

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ClassifyRequest {
	#[serde(default)]
	pub use_ai: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResponse {
	pub meeting_id: Uuid,
	/// `keyword` or `model`.
	pub method: String,
	pub primary_project_id: Option<Uuid>,
	pub matches: Vec<ProjectMatchView>,
	/// Action items now linked to a project.
	pub tasks_linked: usize,
}

impl MeetingService {
	/// Scores the meeting against every registered project, stores the matches with at most one
	/// primary, and links each action item to a project.
	///
	/// With `use_ai` the model ranks the projects; an unusable answer falls back to keyword
	/// matching. The meeting's links and a new version are written in one transaction.
	pub async fn classify_meeting(
		&self,
		meeting_id: Uuid,
		req: ClassifyRequest,
	) -> Result<ClassificationResponse> {
		let view = self.get_meeting(meeting_id).await?;
		let projects: Vec<ProjectProfile> = queries::list_projects(&self.db.pool)
			.await?
			.into_iter()
			.map(|project| ProjectProfile {
				project_id: project.project_id,
				name: project.name,
				keywords: project.keywords.0,
			})
			.collect();
		let text = meeting_text(&view);
		let model_matches = if req.use_ai && !projects.is_empty() {
			self.model_matches(&text, &projects).await
		} else {
			None
		};
		let (method, matches) = match model_matches {
			Some(matches) => ("model", matches),
			None => (
				"keyword",
				classifier::keyword_matches(
					&text,
					&projects,
					self.cfg.classifier.keyword_confidence_cap,
				),
			),
		};
		let primary = classifier::primary_index(&matches, self.cfg.classifier.min_confidence);
		let primary_project_id = primary.map(|idx| matches[idx].project_id);
		let now = OffsetDateTime::now_utc();
		let rows: Vec<MeetingProject> = matches
			.iter()
			.enumerate()
			.map(|(idx, found)| MeetingProject {
				meeting_id,
				project_id: found.project_id,
				confidence: classifier::clamp_confidence(found.confidence),
				is_primary: Some(idx) == primary,
				method: method.to_string(),
				keywords_matched: Json(found.keywords_matched.clone()),
				reasoning: found.reasoning.clone(),
				classified_at: now,
			})
			.collect();
		let candidates: Vec<(Uuid, &str)> = matches
			.iter()
			.filter_map(|found| {
				projects
					.iter()
					.find(|project| project.project_id == found.project_id)
					.map(|project| (project.project_id, project.name.as_str()))
			})
			.collect();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut meeting) = queries::fetch_meeting(&mut *tx, meeting_id).await? else {
			return Err(meetings::meeting_not_found(meeting_id));
		};

		queries::replace_meeting_projects(&mut tx, meeting_id, &rows).await?;

		let mut tasks_linked = 0;

		for mut item in queries::fetch_action_items(&mut *tx, meeting_id).await? {
			let project_id =
				classifier::task_project(&item.description, &candidates, primary_project_id);

			item.project_confidence = project_id.and_then(|project_id| {
				matches
					.iter()
					.find(|found| found.project_id == project_id)
					.map(|found| found.confidence)
			});
			item.project_id = project_id;
			item.updated_at = now;

			if project_id.is_some() {
				tasks_linked += 1;
			}

			queries::update_action_item(&mut tx, &item).await?;
		}

		meeting.updated_at = now;

		queries::update_meeting(&mut tx, &meeting).await?;

		let change_summary = format!("Classified by {method}.");
		let view = meetings::record_version(&mut tx, meeting_id, &change_summary, now).await?;

		tx.commit().await?;

		tracing::info!(
			%meeting_id,
			method,
			matches = matches.len(),
			primary = ?primary_project_id,
			"Meeting classified."
		);

		Ok(ClassificationResponse {
			meeting_id,
			method: method.to_string(),
			primary_project_id,
			matches: view.projects,
			tasks_linked,
		})
	}

	async fn model_matches(
		&self,
		text: &str,
		projects: &[ProjectProfile],
	) -> Option<Vec<ProjectMatch>> {
		let mut prompt = String::from("Projects:\n");

		for project in projects {
			prompt.push_str(&format!(
				"- {}: {} (keywords: {})\n",
				project.project_id,
				project.name,
				project.keywords.join(", ")
			));
		}

		prompt.push_str("\nMeeting text:\n");
		prompt.push_str(&classifier::truncate_words(
			text,
			self.cfg.classifier.transcript_word_limit as usize,
		));

		let request = ChatRequest::text(CLASSIFY_SYSTEM_PROMPT, prompt);
		let content = match self.complete_with_failover("classify", &request).await {
			Ok(content) => content,
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Model classification failed. Falling back to keywords."
				);

				return None;
			},
		};
		let parsed = json::extract_json(&content)
			.ok()
			.and_then(|value| classifier::parse_model_matches(&value, projects));

		if parsed.is_none() {
			tracing::warn!("Model classification was not a match array. Falling back to keywords.");
		}

		parsed
	}
}

/// Everything a reader would scan to tell what the meeting was about.
pub(crate) fn meeting_text(view: &meetings::MeetingView) -> String {
	let mut parts = vec![view.project_name.clone(), view.purpose.clone()];

	for agenda in &view.agenda_items {
		parts.push(format!("{} {}", agenda.item, agenda.notes));
	}
	for item in &view.action_items {
		parts.push(item.description.clone());
	}

	parts.push(view.notes.clone());

	if let Some(summary) = view.summary.as_ref() {
		parts.push(summary.clone());
	}

	parts.retain(|part| !part.trim().is_empty());

	parts.join("\n")
}
