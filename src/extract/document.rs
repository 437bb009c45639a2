//! Word processor, PDF and XML text extraction.

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::{Result, SiftError};

/// Concatenate the text of every body paragraph, one per line.
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| SiftError::decode("docx", e))?;
    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect();
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

/// Text of every page, in page order.
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| SiftError::decode("pdf", e))
}

/// Parse an XML document and write it back out.
///
/// Whitespace-only text is dropped and the declaration, comments,
/// processing instructions and doctype are omitted, so documents that
/// differ only in layout produce the same output. Malformed input is an
/// error, never a verbatim copy.
pub fn xml_text(bytes: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut writer = Writer::new(Vec::with_capacity(bytes.len()));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            SiftError::decode("xml", format!("{e} (byte {})", reader.buffer_position()))
        })?;
        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Start(_) => {
                depth += 1;
                saw_root = true;
                writer
                    .write_event(event)
                    .map_err(|e| SiftError::decode("xml", e))?;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                writer
                    .write_event(event)
                    .map_err(|e| SiftError::decode("xml", e))?;
            }
            Event::Empty(_) => {
                saw_root = true;
                writer
                    .write_event(event)
                    .map_err(|e| SiftError::decode("xml", e))?;
            }
            other => {
                writer
                    .write_event(other)
                    .map_err(|e| SiftError::decode("xml", e))?;
            }
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SiftError::decode("xml", "no root element"));
    }
    if depth != 0 {
        return Err(SiftError::decode("xml", "unclosed element at end of input"));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| SiftError::decode("xml", e))
}
