//! `text/plain` and `text/html`: the payload is checked as a JSON string.
//!
//! The content is wrapped in quotes verbatim, without escaping. Content that
//! holds a bare `"` or a control character therefore yields an invalid JSON
//! literal and is rejected; escape sequences already in the content (`\n`,
//! `\u00e9`) are decoded by the JSON parser.

use serde_json::Value;

use crate::config::ValidatorOptions;
use crate::error::ValidationError;
use crate::schema::compile_json_schema;
use crate::strategies::json::evaluate;

/// The single-token JSON document the content is read as.
pub fn wrap_as_literal(content: &str) -> String {
    format!("\"{content}\"")
}

pub fn check(content: &str, schema: &Value, options: &ValidatorOptions) -> Result<(), ValidationError> {
    let validator = compile_json_schema(schema, options)?;
    let literal: Value = serde_json::from_str(&wrap_as_literal(content))?;
    evaluate(&validator, &literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(content: &str) -> Result<(), ValidationError> {
        check(
            content,
            &json!({ "type": "string", "minLength": 1 }),
            &ValidatorOptions::default(),
        )
    }

    #[test]
    fn test_plain_text_is_a_string_value() {
        assert!(run("hello").is_ok());
    }

    #[test]
    fn test_empty_text_violates_min_length() {
        assert!(matches!(run(""), Err(ValidationError::SchemaViolation { .. })));
    }

    #[test]
    fn test_unescaped_quote_is_rejected() {
        assert!(matches!(
            run(r#"say "hi""#),
            Err(ValidationError::JsonParse(_))
        ));
    }

    #[test]
    fn test_raw_newline_is_rejected() {
        assert!(matches!(run("line\nbreak"), Err(ValidationError::JsonParse(_))));
    }

    #[test]
    fn test_escape_sequences_are_decoded() {
        let result = check(
            r"caf\u00e9",
            &json!({ "const": "café" }),
            &ValidatorOptions::default(),
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_html_markup_without_quotes_passes_pattern() {
        let result = check(
            "<p>hi</p>",
            &json!({ "type": "string", "pattern": "^<p>" }),
            &ValidatorOptions::default(),
        );
        assert!(result.is_ok(), "{result:?}");
    }
}
