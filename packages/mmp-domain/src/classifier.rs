//! Keyword heuristics for guessing which project a meeting or task belongs to, plus the small
//! extractors used on action-item text.

use std::{cmp::Ordering, collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, Duration, Month, Weekday};
use uuid::Uuid;

const STOPWORDS: &[&str] = &[
	"about", "after", "again", "also", "been", "before", "being", "between", "both", "could",
	"does", "doing", "during", "each", "from", "further", "have", "having", "here", "into", "just",
	"more", "most", "other", "over", "project", "same", "should", "some", "such", "than", "that",
	"their", "them", "then", "there", "these", "they", "this", "those", "through", "under",
	"until", "very", "were", "what", "when", "where", "which", "while", "will", "with", "would",
	"your",
];
const NON_NAMES: &[&str] = &[
	"Everyone", "He", "I", "It", "Nobody", "She", "Someone", "Team", "That", "They", "This", "We",
	"Who", "You",
];
/// Model answers that omit a confidence are taken as an even guess.
const DEFAULT_MODEL_CONFIDENCE: f64 = 0.5;
const WEEKDAYS: [(&str, Weekday); 7] = [
	("monday", Weekday::Monday),
	("tuesday", Weekday::Tuesday),
	("wednesday", Weekday::Wednesday),
	("thursday", Weekday::Thursday),
	("friday", Weekday::Friday),
	("saturday", Weekday::Saturday),
	("sunday", Weekday::Sunday),
];

static ASSIGNEE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
	[
		r"@(\w+)",
		r"(?i)\bassigned to\s+(\w+)",
		r"\b([A-Z][\w'-]*)\s+will\b",
		r"\b([A-Z][\w'-]*)\s+to\s+(?:do|complete|finish)\b",
	]
	.map(|pattern| Regex::new(pattern).expect("valid regex"))
});
static WEEKDAY_DEADLINE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"\b(?:by|on|due|before|until)\s+(?:next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
	)
	.expect("valid regex")
});
static ISO_DATE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct ProjectProfile {
	pub project_id: Uuid,
	pub name: String,
	pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMatch {
	pub project_id: Uuid,
	pub confidence: f32,
	pub keywords_matched: Vec<String>,
	pub reasoning: String,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
	project_id: String,
	#[serde(default = "default_confidence")]
	confidence: f64,
	#[serde(default)]
	keywords_matched: Vec<String>,
	#[serde(default)]
	reasoning: String,
}

/// Scores every project by the share of its keywords found in `text`, capped at `cap`.
/// Projects without a single hit are left out. Best match first.
pub fn keyword_matches(text: &str, projects: &[ProjectProfile], cap: f32) -> Vec<ProjectMatch> {
	let haystack = text.to_lowercase();
	let mut scored = Vec::new();

	for project in projects {
		let total = project.keywords.len();

		if total == 0 {
			continue;
		}

		let matched: Vec<String> = project
			.keywords
			.iter()
			.filter(|keyword| contains_term(&haystack, &keyword.to_lowercase()))
			.cloned()
			.collect();

		if matched.is_empty() {
			continue;
		}

		let confidence = clamp_confidence((matched.len() as f32 / total as f32).min(cap));
		let reasoning = format!("Matched {} of {total} keywords.", matched.len());

		scored.push((
			project.name.as_str(),
			ProjectMatch {
				project_id: project.project_id,
				confidence,
				keywords_matched: matched,
				reasoning,
			},
		));
	}

	scored.sort_by(|(left_name, left), (right_name, right)| {
		right
			.confidence
			.partial_cmp(&left.confidence)
			.unwrap_or(Ordering::Equal)
			.then_with(|| left_name.cmp(right_name))
	});

	scored.into_iter().map(|(_, found)| found).collect()
}

/// Reads a model's classification array. Returns `None` when the value is not an array of
/// match objects, so callers can fall back to keyword matching. Unknown project ids are dropped
/// and duplicate ids keep their first entry.
pub fn parse_model_matches(value: &Value, projects: &[ProjectProfile]) -> Option<Vec<ProjectMatch>> {
	let raw: Vec<RawMatch> = serde_json::from_value(value.clone()).ok()?;
	let known: HashSet<Uuid> = projects.iter().map(|project| project.project_id).collect();
	let mut seen = HashSet::new();
	let mut matches = Vec::new();

	for entry in raw {
		let Ok(project_id) = Uuid::parse_str(entry.project_id.trim()) else {
			continue;
		};

		if !known.contains(&project_id) || !seen.insert(project_id) {
			continue;
		}

		matches.push(ProjectMatch {
			project_id,
			confidence: clamp_confidence(entry.confidence as f32),
			keywords_matched: entry.keywords_matched,
			reasoning: entry.reasoning,
		});
	}

	matches.sort_by(|left, right| {
		right.confidence.partial_cmp(&left.confidence).unwrap_or(Ordering::Equal)
	});

	Some(matches)
}

/// Index of the match that becomes primary: the best one at or above `min_confidence`.
pub fn primary_index(matches: &[ProjectMatch], min_confidence: f32) -> Option<usize> {
	let mut best: Option<(usize, f32)> = None;

	for (idx, found) in matches.iter().enumerate() {
		if found.confidence < min_confidence {
			continue;
		}
		if best.map(|(_, score)| found.confidence > score).unwrap_or(true) {
			best = Some((idx, found.confidence));
		}
	}

	best.map(|(idx, _)| idx)
}

/// A task naming one of the candidate projects belongs to it; otherwise it inherits the primary.
pub fn task_project(
	task_text: &str,
	candidates: &[(Uuid, &str)],
	primary: Option<Uuid>,
) -> Option<Uuid> {
	let haystack = task_text.to_lowercase();

	candidates
		.iter()
		.find(|(_, name)| {
			let name = name.trim().to_lowercase();

			!name.is_empty() && contains_term(&haystack, &name)
		})
		.map(|(project_id, _)| *project_id)
		.or(primary)
}

/// Lowercased, deduplicated content words of four or more characters, in order of appearance.
pub fn extract_keywords(name: &str, description: &str, max: usize) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut keywords = Vec::new();

	for token in format!("{name} {description}").split(|ch: char| !ch.is_alphanumeric()) {
		if keywords.len() >= max {
			break;
		}

		let token = token.to_lowercase();

		if token.chars().count() < 4
			|| token.chars().all(|ch| ch.is_ascii_digit())
			|| STOPWORDS.contains(&token.as_str())
		{
			continue;
		}
		if seen.insert(token.clone()) {
			keywords.push(token);
		}
	}

	keywords
}

/// First `limit` whitespace-separated words of `text`.
pub fn truncate_words(text: &str, limit: usize) -> String {
	text.split_whitespace().take(limit).collect::<Vec<_>>().join(" ")
}

pub fn extract_assignee(text: &str) -> Option<String> {
	for re in ASSIGNEE_PATTERNS.iter() {
		for captures in re.captures_iter(text) {
			let Some(name) = captures.get(1).map(|found| found.as_str()) else {
				continue;
			};

			if !NON_NAMES.iter().any(|word| word.eq_ignore_ascii_case(name)) {
				return Some(name.to_string());
			}
		}
	}

	None
}

/// Resolves an explicit `YYYY-MM-DD` date, or a relative phrase against `reference`.
pub fn extract_due_date(text: &str, reference: Option<Date>) -> Option<Date> {
	if let Some(date) = find_iso_date(text) {
		return Some(date);
	}

	let reference = reference?;
	let lower = text.to_lowercase();

	if contains_term(&lower, "tomorrow") {
		return reference.checked_add(Duration::days(1));
	}
	if let Some(day) = WEEKDAY_DEADLINE.captures(&lower).and_then(|captures| captures.get(1))
		&& let Some((_, weekday)) = WEEKDAYS.iter().find(|(name, _)| *name == day.as_str())
	{
		return Some(reference.next_occurrence(*weekday));
	}
	if contains_term(&lower, "end of week") || contains_term(&lower, "end of the week") {
		let ahead = (Weekday::Friday.number_days_from_monday() + 7
			- reference.weekday().number_days_from_monday())
			% 7;

		return reference.checked_add(Duration::days(ahead.into()));
	}
	if contains_term(&lower, "end of month") || contains_term(&lower, "end of the month") {
		return last_day_of_month(reference);
	}
	if contains_term(&lower, "next week") {
		return reference.checked_add(Duration::days(7));
	}
	if contains_term(&lower, "today") || contains_term(&lower, "eod") {
		return Some(reference);
	}

	None
}

pub fn clamp_confidence(value: f32) -> f32 {
	if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn find_iso_date(text: &str) -> Option<Date> {
	ISO_DATE.find_iter(text).find_map(|found| crate::date_serde::parse_date(found.as_str()))
}

fn default_confidence() -> f64 {
	DEFAULT_MODEL_CONFIDENCE
}

fn last_day_of_month(date: Date) -> Option<Date> {
	let first_of_next = match date.month() {
		Month::December => Date::from_calendar_date(date.year() + 1, Month::January, 1),
		month => Date::from_calendar_date(date.year(), month.next(), 1),
	};

	first_of_next.ok()?.previous_day()
}

/// Whole-word containment; both sides must already be lowercase.
fn contains_term(haystack: &str, term: &str) -> bool {
	if term.is_empty() {
		return false;
	}

	haystack.match_indices(term).any(|(start, _)| {
		let before = haystack[..start].chars().next_back();
		let after = haystack[start + term.len()..].chars().next();

		!before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
	})
}
