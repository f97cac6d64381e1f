use serde::{Deserialize, Serialize};

use crate::document::Document;

/// JSON-LD context stamped on every broadcast.
pub const SCHEMA_CONTEXT: &str = "http://schema.org";

/// `@type` of broadcasts created by Plume.
pub const COMMENT_TYPE: &str = "Comment";

/// The user-supplied parts of a broadcast before it is written.
///
/// Each field is optional; empty strings are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastDraft {
    pub text: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub audio: Option<String>,
}

impl BroadcastDraft {
    /// A text-only draft.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Build the typed document that gets written to the archive.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("@context", SCHEMA_CONTEXT);
        doc.insert("@type", COMMENT_TYPE);
        for (key, value) in [
            ("text", &self.text),
            ("image", &self.image),
            ("video", &self.video),
            ("audio", &self.audio),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                doc.insert(key, value);
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_draft_document() {
        let doc = BroadcastDraft::text("hello").to_document();
        assert_eq!(
            doc.into_value(),
            json!({"@context": "http://schema.org", "@type": "Comment", "text": "hello"})
        );
    }

    #[test]
    fn empty_fields_are_omitted() {
        let draft = BroadcastDraft {
            text: Some(String::new()),
            image: Some("dat://a/cat.png".into()),
            video: None,
            audio: Some("dat://a/song.mp3".into()),
        };
        let doc = draft.to_document();
        assert!(doc.get("text").is_none());
        assert!(doc.get("video").is_none());
        assert_eq!(doc.get_str("image"), Some("dat://a/cat.png"));
        assert_eq!(doc.get_str("audio"), Some("dat://a/song.mp3"));
        assert!(doc.is_type("comment"));
    }
}
