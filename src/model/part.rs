//! Leaf parts produced by splitting an email container.

/// Broad content class of a leaf part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// `text/plain`.
    PlainText,
    /// `text/html`, searched as raw markup.
    Html,
    /// Anything else.
    Binary,
}

/// One leaf of a decomposed message.
///
/// Owned by the task processing its container; never shared across
/// containers.
#[derive(Debug, Clone)]
pub struct MessagePart {
    /// Content class derived from `content_type`.
    pub kind: PartKind,
    /// Declared MIME type, lowercased (e.g. `"application/pdf"`).
    pub content_type: String,
    /// Attachment file name, when the part declares one.
    pub filename: Option<String>,
    /// Declared `charset` parameter.
    pub charset: Option<String>,
    /// Transfer-decoded payload.
    pub payload: Vec<u8>,
    /// `true` when the payload was already converted to UTF-8 by the
    /// MIME parser, so `charset` must not be applied again.
    pub utf8: bool,
    /// The transfer encoding (base64, quoted-printable) was broken.
    pub encoding_problem: bool,
}

impl MessagePart {
    /// `true` for parts that go to the attachment persister.
    pub fn is_attachment(&self) -> bool {
        self.filename.as_deref().is_some_and(|n| !n.is_empty())
    }
}

impl PartKind {
    /// Classify a lowercased MIME type.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            "text/plain" => Self::PlainText,
            "text/html" => Self::Html,
            _ => Self::Binary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_kind_from_content_type() {
        assert_eq!(PartKind::from_content_type("text/plain"), PartKind::PlainText);
        assert_eq!(PartKind::from_content_type("text/html"), PartKind::Html);
        assert_eq!(
            PartKind::from_content_type("application/pdf"),
            PartKind::Binary
        );
    }
}
