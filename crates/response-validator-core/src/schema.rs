//! One schema tree, two readings.
//!
//! The expected schema is a single JSON-like tree. JSON and text payloads
//! read it as a JSON Schema; XML payloads read its textual form as XSD
//! markup. Each reading has one compile function here.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ValidatorOptions;
use crate::error::ValidationError;
use crate::xsd::{self, SchemaSet};

/// Textual form of the schema tree.
///
/// A string node renders as its raw contents, which is how XSD markup is
/// carried inside the tree; anything else renders as compact JSON.
pub fn render_schema_text(schema: &Value) -> String {
    match schema {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Compile the schema tree as a JSON Schema.
pub fn compile_json_schema(
    schema: &Value,
    options: &ValidatorOptions,
) -> Result<jsonschema::Validator, ValidationError> {
    let mut engine = jsonschema::options().should_validate_formats(options.validate_formats);
    if let Some(draft) = options.json_draft.engine_draft() {
        engine = engine.with_draft(draft);
    }
    engine
        .build(schema)
        .map_err(|e| ValidationError::SchemaCompile(e.to_string()))
}

/// Compile the schema tree's textual form as XSD into a fresh schema set.
pub fn compile_xml_schema(
    schema: &Value,
    options: &ValidatorOptions,
) -> Result<Arc<SchemaSet>, ValidationError> {
    let text = render_schema_text(schema);
    xsd::compile_schema(&text, options.max_depth).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonDraft;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_render_string_node_is_unquoted() {
        assert_eq!(render_schema_text(&json!("<xs:schema/>")), "<xs:schema/>");
        assert_eq!(
            render_schema_text(&json!({ "type": "string" })),
            r#"{"type":"string"}"#
        );
    }

    #[test]
    fn test_json_schema_compiles_and_checks() {
        let validator = compile_json_schema(
            &json!({ "type": "object", "required": ["x"] }),
            &ValidatorOptions::default(),
        )
        .unwrap();
        assert!(validator.is_valid(&json!({ "x": 1 })));
        assert!(!validator.is_valid(&json!({})));
    }

    #[test]
    fn test_malformed_json_schema_is_an_error() {
        let err = compile_json_schema(&json!({ "type": 12 }), &ValidatorOptions::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::SchemaCompile(_)), "{err}");
    }

    #[test]
    fn test_format_assertion_follows_options() {
        let schema = json!({ "type": "string", "format": "email" });
        let lenient = compile_json_schema(&schema, &ValidatorOptions::default()).unwrap();
        assert!(lenient.is_valid(&json!("not an email")));

        let strict = compile_json_schema(
            &schema,
            &ValidatorOptions {
                validate_formats: true,
                json_draft: JsonDraft::Draft7,
                ..ValidatorOptions::default()
            },
        )
        .unwrap();
        assert!(!strict.is_valid(&json!("not an email")));
    }

    #[test]
    fn test_json_tree_is_not_an_xsd() {
        let err = compile_xml_schema(&json!({ "type": "object" }), &ValidatorOptions::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::XsdParse(_)), "{err}");
    }

    #[test]
    fn test_xsd_string_compiles() {
        let schema = json!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="a"/></xs:schema>"#
        );
        let set = compile_xml_schema(&schema, &ValidatorOptions::default()).unwrap();
        assert_eq!(set.global_elements().len(), 1);
    }
}
