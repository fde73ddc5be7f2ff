pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_projects.sql")),
				"tables/002_meetings.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_meetings.sql")),
				"tables/003_agenda_items.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_agenda_items.sql")),
				"tables/004_attendees.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_attendees.sql")),
				"tables/005_action_items.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_action_items.sql")),
				"tables/006_action_item_dependencies.sql" => out.push_str(include_str!(
					"../../../sql/tables/006_action_item_dependencies.sql"
				)),
				"tables/007_meeting_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_meeting_projects.sql")),
				"tables/008_meeting_versions.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_meeting_versions.sql")),
				"tables/009_screenshots.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_screenshots.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
