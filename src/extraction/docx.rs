//! DOCX text extraction: unzip `word/document.xml` and flatten its runs.

use super::{DocumentFormat, ExtractionError};
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

pub(super) fn extract_docx(data: &[u8]) -> Result<String, ExtractionError> {
    let corrupt = |message: String| ExtractionError::Corrupt {
        format: DocumentFormat::Docx,
        message,
    };

    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|error| corrupt(format!("not a valid DOCX archive: {error}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|error| corrupt(format!("missing {DOCUMENT_PART}: {error}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|error| corrupt(format!("unreadable {DOCUMENT_PART}: {error}")))?;

    Ok(document_xml_to_text(&xml))
}

/// Convert WordprocessingML into plain text.
///
/// Only `<w:t>` runs contribute characters, so tracked deletions (`w:delText`) and field codes
/// (`w:instrText`) are dropped. Paragraph ends, line breaks and carriage returns become `\n`,
/// `<w:tab/>` becomes `\t`, and XML entities are decoded.
fn document_xml_to_text(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len() / 4);
    let mut rest = xml;
    let mut in_run_text = false;

    while let Some(start) = rest.find('<') {
        if in_run_text {
            push_unescaped(&mut text, &rest[..start]);
        }
        let markup = &rest[start..];
        if let Some(comment) = markup.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }
        let Some(end) = tag_end(markup) else {
            rest = "";
            break;
        };
        let tag = &markup[1..end];
        let self_closing = tag.ends_with('/');
        match tag_name(tag) {
            "w:t" => in_run_text = !self_closing,
            "/w:t" => in_run_text = false,
            "/w:p" | "w:br" | "w:cr" => text.push('\n'),
            "w:tab" => text.push('\t'),
            _ => {}
        }
        rest = &markup[end + 1..];
    }
    if in_run_text {
        push_unescaped(&mut text, rest);
    }

    text.trim_matches('\n').to_string()
}

/// Byte offset of the `>` closing the tag that starts `markup`, skipping quoted attribute values.
fn tag_end(markup: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in markup.char_indices().skip(1) {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

fn tag_name(tag: &str) -> &str {
    let tag = tag.trim_end_matches('/');
    tag.split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default()
}

fn push_unescaped(out: &mut String, raw: &str) {
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';').and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi))) {
            Some((decoded, semi)) => {
                out.push(decoded);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
