//! Dispatch from a response record to a verdict.

use serde_json::Value;

use crate::config::ValidatorOptions;
use crate::error::ValidationError;
use crate::media_type::Strategy;
use crate::record::ResponseRecord;
use crate::strategies::{json, text, xml};

/// Decides whether responses conform to their expected schema.
///
/// Missing context (no schema, no content type, unsupported content type)
/// passes. Malformed payloads, unusable schemas and schema violations fail.
/// The validator holds no state beyond its options, so one instance can be
/// shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    pub fn is_valid(&self, response: &ResponseRecord) -> bool {
        let Some(schema) = response.expected_schema.as_ref() else {
            tracing::trace!("no expected schema; accepting");
            return true;
        };
        let content_type = match response.content_type.as_deref() {
            Some(content_type) if !content_type.is_empty() => content_type,
            _ => {
                tracing::trace!("no content type; accepting");
                return true;
            }
        };

        let strategy = Strategy::for_content_type(content_type);
        tracing::trace!(content_type, ?strategy, "dispatching response validation");

        match self.run(strategy, &response.rendered_content(), schema) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(content_type, ?strategy, %error, "response rejected");
                false
            }
        }
    }

    fn run(&self, strategy: Strategy, content: &str, schema: &Value) -> Result<(), ValidationError> {
        match strategy {
            Strategy::Json => json::check(content, schema, &self.options),
            Strategy::Xml => xml::check(content, schema, &self.options),
            Strategy::Text => text::check(content, schema, &self.options),
            Strategy::Permissive => Ok(()),
        }
    }
}

/// Validate with default options.
pub fn is_valid(response: &ResponseRecord) -> bool {
    Validator::default().is_valid(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number_schema() -> Value {
        json!({
            "type": "object",
            "required": ["x"],
            "properties": { "x": { "type": "number" } }
        })
    }

    #[test]
    fn test_no_schema_accepts_anything() {
        let record = ResponseRecord::new()
            .with_content("not-json")
            .with_content_type("application/json");
        assert!(is_valid(&record));
    }

    #[test]
    fn test_missing_or_empty_content_type_accepts() {
        let record = ResponseRecord::new()
            .with_content("not-json")
            .with_schema(number_schema());
        assert!(is_valid(&record));
        assert!(is_valid(&record.clone().with_content_type("")));
    }

    #[test]
    fn test_unsupported_content_type_accepts() {
        let record = ResponseRecord::new()
            .with_content("not-json")
            .with_content_type("image/png")
            .with_schema(number_schema());
        assert!(is_valid(&record));
    }

    #[test]
    fn test_malformed_schema_fails_closed() {
        let record = ResponseRecord::new()
            .with_content(r#"{"x":1}"#)
            .with_content_type("application/json")
            .with_schema(json!({ "type": 12 }));
        assert!(!is_valid(&record));
    }

    #[test]
    fn test_absent_content_is_empty_string() {
        let record = ResponseRecord::new()
            .with_content_type("application/json")
            .with_schema(number_schema());
        assert!(!is_valid(&record));

        let text = ResponseRecord::new()
            .with_content_type("text/plain")
            .with_schema(json!({ "type": "string", "maxLength": 0 }));
        assert!(is_valid(&text));
    }

    #[test]
    fn test_options_reach_strategies() {
        let record = ResponseRecord::new()
            .with_content(r#""nope""#)
            .with_content_type("application/json")
            .with_schema(json!({ "type": "string", "format": "email" }));
        assert!(is_valid(&record));

        let strict = Validator::new(ValidatorOptions {
            validate_formats: true,
            ..ValidatorOptions::default()
        });
        assert!(!strict.is_valid(&record));
    }
}
