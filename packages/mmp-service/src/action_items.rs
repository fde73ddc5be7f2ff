use std::collections::HashMap;

use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{ActionItemView, Error, MeetingService, Result, meetings};
use mmp_domain::{status, validate};
use mmp_storage::queries::{self, ActionItemFilter};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionItemQuery {
	pub meeting_id: Option<Uuid>,
	pub status: Option<String>,
	pub owner: Option<String>,
	#[serde(default)]
	pub overdue_only: bool,
	pub limit: Option<i64>,
}

/// Absent fields stay as they are. An empty `due_date` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionItemPatch {
	pub description: Option<String>,
	pub owner: Option<String>,
	pub due_date: Option<String>,
	pub status: Option<String>,
	pub priority: Option<String>,
}

impl MeetingService {
	/// Across all meetings; earliest due date first.
	pub async fn list_action_items(&self, query: ActionItemQuery) -> Result<Vec<ActionItemView>> {
		let status = match query.status.as_deref().map(str::trim) {
			None | Some("") => None,
			Some(raw) => Some(validate::status(raw, "$.status")?),
		};
		let today = OffsetDateTime::now_utc().date();
		let filter = ActionItemFilter {
			meeting_id: query.meeting_id,
			status: status.map(|status| status.as_str().to_string()),
			owner: query
				.owner
				.map(|owner| owner.trim().to_string())
				.filter(|owner| !owner.is_empty()),
			overdue_as_of: query.overdue_only.then_some(today),
			limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT),
		};
		let mut conn = self.db.pool.acquire().await?;
		let items = queries::list_action_items(&mut *conn, &filter).await?;
		let mut edges: HashMap<Uuid, HashMap<Uuid, Vec<Uuid>>> = HashMap::new();
		let mut views = Vec::with_capacity(items.len());

		for item in items {
			if !edges.contains_key(&item.meeting_id) {
				let mut by_item: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

				for edge in queries::fetch_dependencies(&mut *conn, item.meeting_id).await? {
					by_item.entry(edge.action_item_id).or_default().push(edge.depends_on_id);
				}

				edges.insert(item.meeting_id, by_item);
			}

			let depends_on = edges
				.get(&item.meeting_id)
				.and_then(|by_item| by_item.get(&item.action_item_id))
				.cloned()
				.unwrap_or_default();

			views.push(meetings::action_item_view(item, depends_on, today)?);
		}

		Ok(views)
	}

	/// Applies a partial edit to one action item and records a version of its meeting.
	pub async fn update_action_item(
		&self,
		action_item_id: Uuid,
		patch: ActionItemPatch,
	) -> Result<ActionItemView> {
		if patch.description.is_none()
			&& patch.owner.is_none()
			&& patch.due_date.is_none()
			&& patch.status.is_none()
			&& patch.priority.is_none()
		{
			return Err(Error::invalid("No updates provided."));
		}

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut item) = queries::fetch_action_item(&mut *tx, action_item_id).await? else {
			return Err(Error::NotFound {
				message: format!("Action item {action_item_id} does not exist."),
			});
		};

		if let Some(description) = patch.description.as_deref().map(str::trim) {
			if description.is_empty() {
				return Err(Error::invalid_field(
					"$.description",
					"Action item description is required.",
				));
			}

			item.description = description.to_string();
		}
		if let Some(owner) = patch.owner.as_deref() {
			item.owner = owner.trim().to_string();
		}
		if let Some(raw) = patch.due_date.as_deref() {
			item.due_date = validate::due_date(Some(raw), "$.due_date")?;
		}
		if let Some(raw) = patch.priority.as_deref() {
			item.priority = validate::priority(raw, "$.priority")?.as_str().to_string();
		}
		if let Some(raw) = patch.status.as_deref() {
			let next = validate::status(raw, "$.status")?;
			let prev = meetings::stored_status(&item.status)?;

			item.completed_at = status::completed_at_after(prev, item.completed_at, next, now);
			item.status = next.as_str().to_string();
		}

		item.updated_at = now;

		queries::update_action_item(&mut tx, &item).await?;

		let meeting_id = item.meeting_id;
		let Some(mut meeting) = queries::fetch_meeting(&mut *tx, meeting_id).await? else {
			return Err(meetings::meeting_not_found(meeting_id));
		};

		meeting.updated_at = now;

		queries::update_meeting(&mut tx, &meeting).await?;

		let view =
			meetings::record_version(&mut tx, meeting_id, "Updated action item.", now).await?;

		tx.commit().await?;

		tracing::info!(%action_item_id, %meeting_id, status = %item.status, "Action item updated.");

		view.action_items
			.into_iter()
			.find(|candidate| candidate.action_item_id == action_item_id)
			.ok_or_else(|| Error::NotFound {
				message: format!("Action item {action_item_id} does not exist."),
			})
	}
}
