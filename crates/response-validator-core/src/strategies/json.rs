//! `application/json`: parse the payload and check it against a JSON Schema.

use serde_json::Value;

use crate::config::ValidatorOptions;
use crate::error::ValidationError;
use crate::schema::compile_json_schema;

/// Validate `content` as a JSON document against `schema`.
pub fn check(content: &str, schema: &Value, options: &ValidatorOptions) -> Result<(), ValidationError> {
    let validator = compile_json_schema(schema, options)?;
    let document: Value = serde_json::from_str(content)?;
    evaluate(&validator, &document)
}

/// Shared with the text strategy: first violation wins.
pub(crate) fn evaluate(
    validator: &jsonschema::Validator,
    document: &Value,
) -> Result<(), ValidationError> {
    match validator.iter_errors(document).next() {
        None => Ok(()),
        Some(error) => Err(ValidationError::SchemaViolation {
            path: error.instance_path.to_string(),
            message: error.to_string(),
        }),
    }
}
