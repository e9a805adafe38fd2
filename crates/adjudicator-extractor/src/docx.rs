//! DOCX text extraction
//!
//! A DOCX file is a zip container; the body text lives in
//! `word/document.xml`. Text runs are read in document order:
//!
//! - `w:t` contributes its text
//! - `w:tab` inside a run becomes `\t`
//! - `w:br` and `w:cr` inside a run become `\n`
//! - the end of every paragraph (`w:p`) becomes `\n`

use crate::error::ExtractorError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

/// Largest uncompressed `word/document.xml` accepted
const MAX_DOCUMENT_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Extract the body text of a DOCX file
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractorError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let part = archive.by_name(DOCUMENT_PART)?;

    if part.size() > MAX_DOCUMENT_PART_BYTES {
        return Err(ExtractorError::Extraction(format!(
            "{} is too large: {} bytes",
            DOCUMENT_PART,
            part.size()
        )));
    }

    let mut xml = String::new();
    part.take(MAX_DOCUMENT_PART_BYTES)
        .read_to_string(&mut xml)
        .map_err(|e| ExtractorError::Extraction(format!("Failed to read {}: {}", DOCUMENT_PART, e)))?;

    document_xml_text(&xml)
}

/// Walk WordprocessingML markup and collect its text
pub fn document_xml_text(xml: &str) -> Result<String, ExtractorError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" if in_run => text.push('\t'),
                b"w:br" | b"w:cr" if in_run => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => text.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    #[test]
    fn test_paragraphs_and_runs() {
        let xml = wrap(
            "<w:p><w:r><w:t>Knee surgery </w:t></w:r><w:r><w:t>is covered.</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Waiting period: 90 days.</w:t></w:r></w:p>",
        );
        assert_eq!(
            document_xml_text(&xml).unwrap(),
            "Knee surgery is covered.\nWaiting period: 90 days.\n"
        );
    }

    #[test]
    fn test_tabs_and_breaks() {
        let xml = wrap("<w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t><w:br/><w:t>C</w:t></w:r></w:p>");
        assert_eq!(document_xml_text(&xml).unwrap(), "A\tB\nC\n");
    }

    #[test]
    fn test_tab_stops_in_properties_ignored() {
        let xml = wrap(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Clause</w:t></w:r></w:p>"#,
        );
        assert_eq!(document_xml_text(&xml).unwrap(), "Clause\n");
    }

    #[test]
    fn test_entities_unescaped_and_space_preserved() {
        let xml = wrap(r#"<w:p><w:r><w:t xml:space="preserve">  A &amp; B  </w:t></w:r></w:p>"#);
        assert_eq!(document_xml_text(&xml).unwrap(), "  A & B  \n");
    }

    #[test]
    fn test_empty_paragraph() {
        let xml = wrap("<w:p/><w:p><w:r><w:t>x</w:t></w:r></w:p>");
        assert_eq!(document_xml_text(&xml).unwrap(), "\nx\n");
    }

    #[test]
    fn test_not_a_zip() {
        let result = extract_docx_text(b"PK not really");
        assert!(matches!(result, Err(ExtractorError::Extraction(_))));
    }

    #[test]
    fn test_malformed_markup() {
        let result = document_xml_text("<w:document><w:p></w:r></w:document>");
        assert!(matches!(result, Err(ExtractorError::Extraction(_))));
    }
}
