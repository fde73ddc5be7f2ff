use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MeetingService, Result};
use mmp_domain::{classifier, validate::MAX_NAME_CHARS};
use mmp_storage::{models::Project, queries};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectRequest {
	pub name: String,
	#[serde(default)]
	pub description: String,
	/// Extracted from the name and description when empty.
	#[serde(default)]
	pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
	pub project_id: Uuid,
	pub name: String,
	pub description: String,
	pub keywords: Vec<String>,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub created_at: OffsetDateTime,
}
impl From<Project> for ProjectView {
	fn from(project: Project) -> Self {
		Self {
			project_id: project.project_id,
			name: project.name,
			description: project.description,
			keywords: project.keywords.0,
			created_at: project.created_at,
		}
	}
}

impl MeetingService {
	pub async fn register_project(&self, req: ProjectRequest) -> Result<ProjectView> {
		let name = req.name.trim();

		if name.is_empty() {
			return Err(Error::invalid_field("$.name", "name is required."));
		}
		if name.chars().count() > MAX_NAME_CHARS {
			return Err(Error::invalid_field(
				"$.name",
				format!("name must be at most {MAX_NAME_CHARS} characters."),
			));
		}

		let description = req.description.trim();
		let mut seen = HashSet::new();
		let mut keywords: Vec<String> = req
			.keywords
			.iter()
			.map(|keyword| keyword.trim().to_lowercase())
			.filter(|keyword| !keyword.is_empty() && seen.insert(keyword.clone()))
			.collect();

		if keywords.is_empty() {
			keywords = classifier::extract_keywords(
				name,
				description,
				self.cfg.classifier.max_keywords as usize,
			);
		}

		let now = OffsetDateTime::now_utc();
		let project = Project {
			project_id: Uuid::new_v4(),
			name: name.to_string(),
			description: description.to_string(),
			keywords: Json(keywords),
			created_at: now,
			updated_at: now,
		};

		match queries::insert_project(&self.db.pool, &project).await {
			Ok(()) => {},
			Err(mmp_storage::Error::Sqlx(sqlx::Error::Database(err)))
				if err.is_unique_violation() =>
				return Err(Error::Conflict {
					message: format!("A project named {name:?} already exists."),
				}),
			Err(err) => return Err(err.into()),
		}

		tracing::info!(project_id = %project.project_id, name, "Project registered.");

		Ok(project.into())
	}

	/// Alphabetical.
	pub async fn list_projects(&self) -> Result<Vec<ProjectView>> {
		let projects = queries::list_projects(&self.db.pool).await?;

		Ok(projects.into_iter().map(ProjectView::from).collect())
	}

	/// Classification rows go with the project; linked action items lose their link.
	pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
		let deleted = queries::delete_project(&self.db.pool, project_id).await?;

		if deleted == 0 {
			return Err(Error::NotFound {
				message: format!("Project {project_id} does not exist."),
			});
		}

		tracing::info!(%project_id, "Project deleted.");

		Ok(())
	}
}
