// Content extractors.
//
// Each function turns the bytes (or values) of one known format into plain
// text and reports failures as a message. They are pure and synchronous; the
// dispatcher decides which thread they run on.

use quick_xml::events::Event;
use quick_xml::reader::Reader as XmlReader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Word documents keep their body in this archive entry.
const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Text of every page, each page followed by a newline.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())?;

    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    Ok(text)
}

/// Text of every body paragraph of a DOCX file, each followed by a newline.
///
/// Only paragraphs that are direct children of `<w:body>` count, so table
/// cells and content controls are skipped. Empty paragraphs still produce
/// their newline.
pub fn docx_to_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("Failed to read DOCX archive: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_ENTRY)
        .map_err(|_| format!("Could not find {} in DOCX file", DOCX_BODY_ENTRY))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("Failed to read {}: {}", DOCX_BODY_ENTRY, e))?;

    paragraphs_from_document_xml(&xml)
}

/// Run content that carries its own paragraphs (text boxes, shapes, embedded
/// objects). None of it is part of the surrounding paragraph's text.
fn is_embedded_content(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"AlternateContent" | b"drawing" | b"pict" | b"object" | b"txbxContent"
    )
}

/// Walks WordprocessingML and collects body paragraph text.
fn paragraphs_from_document_xml(xml: &str) -> Result<String, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut output = String::new();
    // Open element count, and the count at which `<w:body>` was opened.
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    // Some while inside a body-level paragraph.
    let mut paragraph: Option<String> = None;
    let mut embedded_depth = 0usize;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                let name = name.as_ref();
                let body_child = body_depth.is_some_and(|body| depth == body + 1);

                if name == b"body" {
                    body_depth = Some(depth);
                } else if name == b"p" && body_child {
                    paragraph = Some(String::new());
                } else if paragraph.is_some() && is_embedded_content(name) {
                    embedded_depth += 1;
                } else if embedded_depth == 0 {
                    match name {
                        b"r" => in_run = true,
                        b"t" if in_run => in_text = true,
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                match (name.as_ref(), paragraph.as_mut()) {
                    // `<w:p/>` directly in the body is a blank line.
                    (b"p", None) if body_depth == Some(depth) => output.push('\n'),
                    (b"tab", Some(text)) if in_run && embedded_depth == 0 => text.push('\t'),
                    (b"br" | b"cr", Some(text)) if in_run && embedded_depth == 0 => {
                        text.push('\n')
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(text) = paragraph.as_mut() {
                    if in_text && embedded_depth == 0 {
                        let unescaped =
                            e.unescape().map_err(|e| format!("Invalid DOCX text: {}", e))?;
                        text.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                let body_child = body_depth.is_some_and(|body| depth == body + 1);

                if name == b"p" && body_child {
                    if let Some(text) = paragraph.take() {
                        output.push_str(&text);
                        output.push('\n');
                    }
                    embedded_depth = 0;
                    in_run = false;
                    in_text = false;
                } else if name == b"body" {
                    body_depth = None;
                } else if paragraph.is_some() && is_embedded_content(name) {
                    embedded_depth = embedded_depth.saturating_sub(1);
                } else if embedded_depth == 0 {
                    match name {
                        b"r" => in_run = false,
                        b"t" => in_text = false,
                        _ => {}
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Malformed DOCX XML: {}", e)),
            _ => {}
        }
    }

    Ok(output)
}

/// Appends sheet rows: cells joined by a space, each row followed by a newline.
pub fn append_rows(rows: &[Vec<String>], output: &mut String) {
    for row in rows {
        output.push_str(&row.join(" "));
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCX_BODY_ENTRY, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn docx_paragraphs_are_newline_terminated() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> World</w:t></w:r></w:p>
<w:p/>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>A</w:t><w:tab/><w:t>B &amp; C</w:t></w:r></w:p>"#,
        );

        let text = docx_to_text(&bytes).unwrap();
        assert_eq!(text, "Hello World\n\nA\tB & C\n");
    }

    #[test]
    fn docx_table_paragraphs_are_skipped() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>Intro</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Outro</w:t></w:r></w:p>"#,
        );

        assert_eq!(docx_to_text(&bytes).unwrap(), "Intro\nOutro\n");
    }

    #[test]
    fn docx_text_box_does_not_break_the_surrounding_paragraph() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:drawing><wp:anchor xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><wps:wsp xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"><wps:txbx><w:txbxContent><w:p><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></wps:txbx></wps:wsp></wp:anchor></w:drawing></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
<w:p><w:r><w:t>Next</w:t></w:r></w:p>"#,
        );

        assert_eq!(docx_to_text(&bytes).unwrap(), "Hello world\nNext\n");
    }

    #[test]
    fn docx_alternate_content_and_content_controls_are_skipped() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>Before</w:t></w:r><w:r><mc:AlternateContent xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><mc:Choice Requires="wps"><w:txbxContent><w:p><w:r><w:t>choice</w:t></w:r></w:p></w:txbxContent></mc:Choice><mc:Fallback><w:pict><w:txbxContent><w:p><w:r><w:t>fallback</w:t></w:r></w:p></w:txbxContent></w:pict></mc:Fallback></mc:AlternateContent></w:r><w:r><w:t xml:space="preserve"> after</w:t></w:r></w:p>
<w:sdt><w:sdtContent><w:p><w:r><w:t>control</w:t></w:r></w:p></w:sdtContent></w:sdt>
<w:p/>"#,
        );

        assert_eq!(docx_to_text(&bytes).unwrap(), "Before after\n\n");
    }

    #[test]
    fn docx_without_body_entry_is_an_error() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = docx_to_text(&bytes).unwrap_err();
        assert!(err.contains("word/document.xml"));
    }

    #[test]
    fn non_zip_bytes_are_not_a_docx() {
        assert!(docx_to_text(b"plain text, not a zip").is_err());
    }

    #[test]
    fn rows_join_cells_with_spaces() {
        let mut text = String::new();
        append_rows(
            &[
                vec!["x".to_string(), "1".to_string()],
                vec!["y".to_string(), "2".to_string()],
            ],
            &mut text,
        );
        append_rows(&[vec!["z".to_string(), "3".to_string()]], &mut text);

        assert_eq!(text, "x 1\ny 2\nz 3\n");
    }

    #[test]
    fn empty_rows_still_emit_a_line() {
        let mut text = String::new();
        append_rows(&[vec![], vec!["only".to_string()]], &mut text);
        assert_eq!(text, "\nonly\n");
    }
}
