//! MIME decomposition: one email container into its leaf parts.

use std::path::Path;

use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::warn;

use crate::error::{Result, SiftError};
use crate::model::part::{MessagePart, PartKind};

/// Maximum nesting of attached `message/rfc822` parts that is descended
/// into (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 10;

/// Marker placed before raw HTML bodies.
pub const HTML_MARKER: &str = "HTML content:\n";

/// Placeholder searched instead of a text body that failed to decode.
pub const DECODE_FAILED: &str = "Failed to decode content";

/// Split a raw message into its leaf parts, in document order.
///
/// Multipart containers are skipped (they carry only structure); attached
/// messages are descended into. `path` is only used for error context.
pub fn decompose(path: &Path, raw: &[u8]) -> Result<Vec<MessagePart>> {
    let message_bytes = skip_from_line(raw);
    if message_bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(SiftError::InvalidMessage(path.to_path_buf()));
    }

    let parsed = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| SiftError::InvalidMessage(path.to_path_buf()))?;

    let mut leaves = Vec::new();
    collect_leaves(&parsed, 0, &mut leaves);
    Ok(leaves)
}

fn collect_leaves(msg: &mail_parser::Message<'_>, depth: usize, out: &mut Vec<MessagePart>) {
    for part in &msg.parts {
        match &part.body {
            PartType::Multipart(_) => {}
            PartType::Message(inner) => {
                if depth < MAX_DEPTH {
                    collect_leaves(inner, depth + 1, out);
                } else {
                    warn!(depth, "Attached message nested too deeply, skipping");
                }
            }
            body => out.push(leaf_part(part, body)),
        }
    }
}

fn leaf_part(part: &mail_parser::MessagePart<'_>, body: &PartType<'_>) -> MessagePart {
    let content_type = part
        .content_type()
        .map(|ct: &mail_parser::ContentType| {
            let main = ct.ctype();
            match ct.subtype() {
                Some(sub) => format!("{main}/{sub}"),
                None => main.to_string(),
            }
        })
        .map(|ct| ct.to_ascii_lowercase())
        .unwrap_or_else(|| {
            match body {
                PartType::Text(_) => "text/plain",
                PartType::Html(_) => "text/html",
                _ => "application/octet-stream",
            }
            .to_string()
        });

    let charset = part
        .content_type()
        .and_then(|ct| ct.attribute("charset"))
        .map(str::to_string);

    let (payload, utf8) = match body {
        PartType::Text(text) | PartType::Html(text) => (text.as_bytes().to_vec(), true),
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => (bytes.to_vec(), false),
        PartType::Message(_) | PartType::Multipart(_) => (Vec::new(), false),
    };

    MessagePart {
        kind: PartKind::from_content_type(&content_type),
        content_type,
        filename: part.attachment_name().map(str::to_string),
        charset,
        payload,
        utf8,
        encoding_problem: part.is_encoding_problem,
    }
}

/// Searchable text of a non-attachment part.
///
/// Plain text is decoded with its declared charset (or the placeholder
/// [`DECODE_FAILED`]), HTML is kept as markup behind [`HTML_MARKER`], and
/// anything else is reduced to its content type.
pub fn part_text(part: &MessagePart) -> String {
    match part.kind {
        PartKind::PlainText => decode_text(part).unwrap_or_else(|| DECODE_FAILED.to_string()),
        PartKind::Html => format!("{HTML_MARKER}{}", String::from_utf8_lossy(&part.payload)),
        PartKind::Binary => format!("Non-text content. Content type: {}", part.content_type),
    }
}

fn decode_text(part: &MessagePart) -> Option<String> {
    if part.encoding_problem {
        return None;
    }
    if part.utf8 {
        return std::str::from_utf8(&part.payload).ok().map(str::to_string);
    }
    decode_charset(part.charset.as_deref().unwrap_or("us-ascii"), &part.payload)
}

/// Decode bytes using a named charset. Unknown labels and malformed
/// sequences return `None`.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> Option<String> {
    let encoding = encoding_rs::Encoding::for_label(charset.trim().as_bytes())?;
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(charset, "Malformed bytes for declared charset");
        return None;
    }
    Some(decoded.into_owned())
}

/// Skip the `From ` separator line at the start of MBOX-style messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
