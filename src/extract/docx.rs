use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};

use super::TextExtractor;
use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// Reads paragraph text from the main document part of an Office Open XML archive.
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Extraction(format!("DOCX is not a valid archive: {}", e)))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| Error::Extraction(format!("DOCX has no {}: {}", DOCUMENT_PART, e)))?
            .read_to_string(&mut xml)
            .map_err(|e| Error::Extraction(format!("DOCX document part unreadable: {}", e)))?;

        Ok(paragraphs(&xml)?.join("\n"))
    }
}

/// Paragraph texts in document order. A paragraph nested inside another
/// (text boxes) splits its parent: text before the box, the box, then the
/// rest of the parent each come out as their own entry.
fn paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Extraction(format!(
                "DOCX XML malformed at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => match e.name().as_ref() {
                b"w:p" => {
                    if depth > 0 && !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                    }
                    depth += 1;
                }
                b"w:t" => in_text = true,
                _ => push_break(e, depth, &mut current),
            },
            Event::Empty(ref e) => push_break(e, depth, &mut current),
            Event::End(ref e) => match e.name().as_ref() {
                b"w:p" if depth > 0 => {
                    out.push(std::mem::take(&mut current));
                    depth -= 1;
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(ref t) if in_text && depth > 0 => {
                let text = t.unescape().map_err(|e| {
                    Error::Extraction(format!("DOCX text has a bad entity: {}", e))
                })?;
                current.push_str(&text);
            }
            Event::CData(ref c) if in_text && depth > 0 => {
                current.push_str(&String::from_utf8_lossy(c));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

fn push_break(tag: &BytesStart<'_>, depth: usize, current: &mut String) {
    if depth == 0 {
        return;
    }
    match tag.name().as_ref() {
        b"w:tab" => current.push('\t'),
        b"w:br" | b"w:cr" => current.push('\n'),
        _ => {}
    }
}
