//! Error types for response validation.
//!
//! These never cross the [`crate::is_valid`] boundary: every variant is folded
//! into a `false` verdict there. They exist so each strategy can propagate
//! with `?` and so the rejection reason can be logged.

use thiserror::Error;

/// Why a strategy rejected a response.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The expected schema is not a usable JSON Schema.
    #[error("JSON schema failed to compile: {0}")]
    SchemaCompile(String),

    /// The payload (or the wrapped text literal) is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The payload parsed but does not satisfy the JSON schema.
    #[error("payload violates schema at '{path}': {message}")]
    SchemaViolation { path: String, message: String },

    /// The rendered schema text is not well-formed XML.
    #[error("XSD text is not well-formed XML: {0}")]
    XsdParse(String),

    /// The XSD is well-formed XML but not a schema this engine can compile.
    #[error("XSD failed to compile: {0}")]
    XsdCompile(String),

    /// The payload is not a well-formed XML document.
    #[error("payload is not well-formed XML: {0}")]
    XmlMalformed(String),

    /// The payload is well-formed XML but breaks the schema.
    #[error("payload violates XSD at '{path}': {message}")]
    XmlViolation { path: String, message: String },

    /// Schema compilation recursed past the configured limit.
    #[error("schema nesting exceeded max depth {max_depth} at '{path}'")]
    DepthExceeded { path: String, max_depth: usize },
}

impl ValidationError {
    pub(crate) fn xml_violation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::XmlViolation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn xsd_compile(message: impl Into<String>) -> Self {
        Self::XsdCompile(message.into())
    }
}
