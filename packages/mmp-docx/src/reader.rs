use std::io::{BufReader, Cursor};

use quick_xml::{Reader, events::Event};

use crate::{
	ActionRow, AgendaRow, AttendeeRow, Error, Minutes, PRESENT_MARK, Result, TABLE_COUNT,
};

/// Cell text, row by row.
pub type Table = Vec<Vec<String>>;

/// Reads the text of every top-level table in `word/document.xml`.
///
/// Paragraphs within a cell and `<w:br/>` breaks both become `\n`. Tables nested inside a cell
/// contribute their text to the enclosing cell.
pub fn read_tables(bytes: &[u8]) -> Result<Vec<Table>> {
	let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
	let doc = archive.by_name("word/document.xml")?;
	let mut reader = Reader::from_reader(BufReader::new(doc));
	let mut buf = Vec::new();
	let mut tables = Vec::new();
	let mut depth = 0_usize;
	let mut table: Table = Vec::new();
	let mut row: Vec<String> = Vec::new();
	let mut cell: Option<String> = None;
	let mut paragraphs = 0_usize;
	let mut in_text = false;

	loop {
		match reader.read_event_into(&mut buf)? {
			Event::Start(ref e) => match e.local_name().as_ref() {
				b"tbl" => {
					depth += 1;

					if depth == 1 {
						table = Vec::new();
					}
				},
				b"tr" if depth == 1 => row = Vec::new(),
				b"tc" if depth == 1 => {
					cell = Some(String::new());
					paragraphs = 0;
				},
				b"p" =>
					if let Some(text) = cell.as_mut() {
						if paragraphs > 0 {
							text.push('\n');
						}

						paragraphs += 1;
					},
				b"t" => in_text = true,
				_ => {},
			},
			Event::Empty(ref e) => match e.local_name().as_ref() {
				b"br" | b"cr" =>
					if let Some(text) = cell.as_mut() {
						text.push('\n');
					},
				b"tab" =>
					if let Some(text) = cell.as_mut() {
						text.push('\t');
					},
				b"p" =>
					if let Some(text) = cell.as_mut() {
						if paragraphs > 0 {
							text.push('\n');
						}

						paragraphs += 1;
					},
				_ => {},
			},
			Event::Text(e) =>
				if in_text && let Some(text) = cell.as_mut() {
					text.push_str(&e.unescape()?);
				},
			Event::End(ref e) => match e.local_name().as_ref() {
				b"t" => in_text = false,
				b"tc" if depth == 1 =>
					if let Some(text) = cell.take() {
						row.push(text);
					},
				b"tr" if depth == 1 => table.push(std::mem::take(&mut row)),
				b"tbl" => {
					if depth == 1 {
						tables.push(std::mem::take(&mut table));
					}

					depth = depth.saturating_sub(1);
				},
				_ => {},
			},
			Event::Eof => break,
			_ => {},
		}

		buf.clear();
	}

	Ok(tables)
}

/// Reads minutes back from a document laid out by [`crate::render`].
///
/// Header rows are skipped, rows with every cell blank are ignored, and missing trailing cells
/// read as empty.
pub fn parse_minutes(bytes: &[u8]) -> Result<Minutes> {
	let tables = read_tables(bytes)?;

	if tables.len() < TABLE_COUNT {
		return Err(Error::Malformed {
			message: format!(
				"Expected {TABLE_COUNT} tables but the document has {}.",
				tables.len()
			),
		});
	}

	let project = body_rows(&tables[0]).next();
	let purpose = body_rows(&tables[1]).next();
	let agenda = body_rows(&tables[2])
		.map(|row| AgendaRow { item: cell(row, 0), notes: cell(row, 1) })
		.collect();
	let mut attendees = Vec::new();

	for row in body_rows(&tables[3]) {
		for offset in [0, 2] {
			let name = cell(row, offset);

			if name.is_empty() {
				continue;
			}

			attendees.push(AttendeeRow { name, attended: cell(row, offset + 1) == PRESENT_MARK });
		}
	}

	let action_items = body_rows(&tables[4])
		.map(|row| ActionRow {
			description: cell(row, 0),
			owner: cell(row, 1),
			due_date: cell(row, 2),
			status: cell(row, 3),
		})
		.collect();

	Ok(Minutes {
		project_name: project.map(|row| cell(row, 0)).unwrap_or_default(),
		meeting_date: project.map(|row| cell(row, 1)).unwrap_or_default(),
		purpose: purpose.map(|row| cell(row, 0)).unwrap_or_default(),
		agenda,
		attendees,
		action_items,
	})
}

fn body_rows(table: &Table) -> impl Iterator<Item = &Vec<String>> {
	table.iter().skip(1).filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
}

fn cell(row: &[String], idx: usize) -> String {
	row.get(idx).map(|text| text.trim().to_string()).unwrap_or_default()
}
