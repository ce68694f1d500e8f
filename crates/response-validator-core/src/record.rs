//! The response under validation.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    /// String form of the payload. Bytes are decoded as UTF-8, lossily.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Content::Text(text) => Cow::Borrowed(text),
            Content::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_owned())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

/// A response payload together with its declared media type and the schema
/// it is expected to satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseRecord {
    pub content: Option<Content>,
    pub content_type: Option<String>,
    pub expected_schema: Option<Value>,
}

impl ResponseRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.expected_schema = Some(schema);
        self
    }

    /// String form of the payload; absent content renders as `""`.
    pub fn rendered_content(&self) -> Cow<'_, str> {
        self.content
            .as_ref()
            .map(Content::render)
            .unwrap_or(Cow::Borrowed(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_absent_content_renders_empty() {
        assert_eq!(ResponseRecord::new().rendered_content(), "");
    }

    #[test]
    fn test_invalid_utf8_bytes_render_lossily() {
        let record = ResponseRecord::new().with_content(vec![b'o', b'k', 0xFF]);
        assert_eq!(record.rendered_content(), "ok\u{FFFD}");
    }

    #[test]
    fn test_deserialize_from_fixture() {
        let record: ResponseRecord = serde_json::from_value(json!({
            "content": { "text": "{\"x\":1}" },
            "content_type": "application/json",
            "expected_schema": { "type": "object" }
        }))
        .unwrap();

        assert_eq!(
            record,
            ResponseRecord::new()
                .with_content("{\"x\":1}")
                .with_content_type("application/json")
                .with_schema(json!({ "type": "object" }))
        );
    }
}
