use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionStatus {
	#[default]
	Pending,
	#[serde(rename = "In Progress")]
	InProgress,
	Completed,
	Blocked,
}
impl ActionStatus {
	pub const ALL: [Self; 4] = [Self::Pending, Self::InProgress, Self::Completed, Self::Blocked];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "Pending",
			Self::InProgress => "In Progress",
			Self::Completed => "Completed",
			Self::Blocked => "Blocked",
		}
	}

	/// Exact match on the stored spelling.
	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|status| status.as_str() == raw)
	}

	/// Case- and separator-insensitive match, for model output and pasted text.
	pub fn parse_loose(raw: &str) -> Option<Self> {
		let folded: String = raw
			.chars()
			.filter(|ch| ch.is_alphanumeric())
			.flat_map(char::to_lowercase)
			.collect();

		match folded.as_str() {
			"pending" | "open" | "todo" | "notstarted" => Some(Self::Pending),
			"inprogress" | "started" | "ongoing" => Some(Self::InProgress),
			"completed" | "complete" | "done" | "closed" => Some(Self::Completed),
			"blocked" | "onhold" => Some(Self::Blocked),
			_ => None,
		}
	}

	pub fn is_completed(self) -> bool {
		matches!(self, Self::Completed)
	}
}
impl std::fmt::Display for ActionStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
	Low,
	#[default]
	Medium,
	High,
}
impl Priority {
	pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|priority| priority.as_str().eq_ignore_ascii_case(raw))
	}
}

/// Every status may move to every other status. Only `completed_at` reacts: it is stamped on
/// entering `Completed`, kept while staying there, and cleared on leaving.
pub fn completed_at_after(
	prev: ActionStatus,
	prev_completed_at: Option<OffsetDateTime>,
	next: ActionStatus,
	now: OffsetDateTime,
) -> Option<OffsetDateTime> {
	match (prev.is_completed(), next.is_completed()) {
		(_, false) => None,
		(true, true) => prev_completed_at.or(Some(now)),
		(false, true) => Some(now),
	}
}

pub fn is_overdue(due_date: Option<Date>, status: ActionStatus, today: Date) -> bool {
	!status.is_completed() && due_date.is_some_and(|due| due < today)
}
