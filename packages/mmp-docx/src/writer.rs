use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

use crate::{Minutes, PRESENT_MARK, Result};

const CONTENT_TYPES_XML: &str = concat!(
	r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
	r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
	r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
	r#"<Default Extension="xml" ContentType="application/xml"/>"#,
	r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
	r#"</Types>"#,
);
const PACKAGE_RELS_XML: &str = concat!(
	r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
	r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
	r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
	r#"</Relationships>"#,
);
const DOCUMENT_RELS_XML: &str = concat!(
	r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
	r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#,
);
const DOCUMENT_OPEN: &str = concat!(
	r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
	r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
	"<w:body>",
);
const DOCUMENT_CLOSE: &str = concat!(
	r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#,
	r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#,
	"</w:sectPr></w:body></w:document>",
);
const TABLE_BORDERS: &str = concat!(
	"<w:tblBorders>",
	r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
	r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
	r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
	r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
	r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
	r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
	"</w:tblBorders>",
);
/// Text width of a letter page with one-inch margins, in twentieths of a point.
const TEXT_WIDTH: u32 = 9360;

/// Renders the minutes as a DOCX package.
///
/// Output is a pure function of the input: zip entries carry a fixed timestamp and are written in a
/// fixed order, so identical minutes produce identical bytes.
pub fn render(minutes: &Minutes) -> Result<Vec<u8>> {
	let document = document_xml(minutes);
	let options = SimpleFileOptions::default()
		.compression_method(CompressionMethod::Deflated)
		.last_modified_time(DateTime::default());
	let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

	for (name, body) in [
		("[Content_Types].xml", CONTENT_TYPES_XML),
		("_rels/.rels", PACKAGE_RELS_XML),
		("word/document.xml", document.as_str()),
		("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
	] {
		zip.start_file(name, options)?;
		zip.write_all(body.as_bytes())?;
	}

	Ok(zip.finish()?.into_inner())
}

pub fn document_xml(minutes: &Minutes) -> String {
	let mut xml = String::from(DOCUMENT_OPEN);

	push_heading(&mut xml, "Meeting Minutes", 32);

	push_heading(&mut xml, "Project", 24);
	push_table(&mut xml, &["Project", "Date"], vec![vec![
		minutes.project_name.as_str(),
		minutes.meeting_date.as_str(),
	]]);

	push_heading(&mut xml, "Meeting Purpose", 24);
	push_table(&mut xml, &["Meeting Purpose"], vec![vec![minutes.purpose.as_str()]]);

	push_heading(&mut xml, "Agenda", 24);
	push_table(
		&mut xml,
		&["Agenda Item", "Notes"],
		minutes.agenda.iter().map(|row| vec![row.item.as_str(), row.notes.as_str()]).collect(),
	);

	push_heading(&mut xml, "Attendees", 24);
	push_table(
		&mut xml,
		&["Attendee", "Present", "Attendee", "Present"],
		minutes
			.attendees
			.chunks(2)
			.map(|pair| {
				let mut cells = Vec::with_capacity(4);

				for attendee in pair {
					cells.push(attendee.name.as_str());
					cells.push(if attendee.attended { PRESENT_MARK } else { "" });
				}

				cells.resize(4, "");

				cells
			})
			.collect(),
	);

	push_heading(&mut xml, "Action Items", 24);
	push_table(
		&mut xml,
		&["Description", "Owner", "Due Date", "Status"],
		minutes
			.action_items
			.iter()
			.map(|row| {
				vec![
					row.description.as_str(),
					row.owner.as_str(),
					row.due_date.as_str(),
					row.status.as_str(),
				]
			})
			.collect(),
	);

	xml.push_str(DOCUMENT_CLOSE);

	xml
}

/// `half_points` is the run size, e.g. 24 for 12pt.
fn push_heading(xml: &mut String, text: &str, half_points: u32) {
	xml.push_str(r#"<w:p><w:pPr><w:spacing w:before="240" w:after="120"/></w:pPr><w:r><w:rPr><w:b/>"#);
	xml.push_str(&format!(r#"<w:sz w:val="{half_points}"/></w:rPr>"#));
	push_text(xml, text);
	xml.push_str("</w:r></w:p>");
}

fn push_table(xml: &mut String, header: &[&str], rows: Vec<Vec<&str>>) {
	let width = TEXT_WIDTH / header.len() as u32;

	xml.push_str("<w:tbl><w:tblPr>");
	xml.push_str(&format!(r#"<w:tblW w:w="{TEXT_WIDTH}" w:type="dxa"/>"#));
	xml.push_str(TABLE_BORDERS);
	xml.push_str("</w:tblPr><w:tblGrid>");

	for _ in header {
		xml.push_str(&format!(r#"<w:gridCol w:w="{width}"/>"#));
	}

	xml.push_str("</w:tblGrid>");
	push_row(xml, header, width, true);

	for row in rows {
		push_row(xml, &row, width, false);
	}

	xml.push_str("</w:tbl>");
}

fn push_row(xml: &mut String, cells: &[&str], width: u32, bold: bool) {
	xml.push_str("<w:tr>");

	for cell in cells {
		xml.push_str(&format!(r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/></w:tcPr><w:p>"#));

		if !cell.is_empty() {
			xml.push_str("<w:r>");

			if bold {
				xml.push_str("<w:rPr><w:b/></w:rPr>");
			}

			push_text(xml, cell);
			xml.push_str("</w:r>");
		}

		xml.push_str("</w:p></w:tc>");
	}

	xml.push_str("</w:tr>");
}

/// Line breaks inside a cell become `<w:br/>` so the reader can restore them.
fn push_text(xml: &mut String, text: &str) {
	let text = xml_safe(text);

	for (idx, line) in text.split('\n').enumerate() {
		if idx > 0 {
			xml.push_str("<w:br/>");
		}

		xml.push_str(r#"<w:t xml:space="preserve">"#);
		xml.push_str(&escape(line.trim_end_matches('\r')));
		xml.push_str("</w:t>");
	}
}

/// Drops characters XML 1.0 cannot carry at all.
fn xml_safe(text: &str) -> String {
	text.chars().filter(|ch| matches!(ch, '\t' | '\n' | '\r') || *ch >= ' ').collect()
}
