#![no_main]

use libfuzzer_sys::fuzz_target;
use response_validator_core::{is_valid, ResponseRecord};

const CONTENT_TYPES: &[&str] = &["application/json", "application/xml", "text/plain", "text/html"];

const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="root"><xs:complexType><xs:sequence>
    <xs:element name="x" type="xs:int" maxOccurs="unbounded"/>
  </xs:sequence></xs:complexType></xs:element>
</xs:schema>"#;

// First byte picks the content type; the rest is split at the first NUL into
// schema text and content. Schema text that is not JSON is used as a string
// node, so arbitrary XSD markup gets fuzzed too.
fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let content_type = CONTENT_TYPES[selector as usize % CONTENT_TYPES.len()];
    let (schema_bytes, content) = match rest.iter().position(|&b| b == 0) {
        Some(split) => (&rest[..split], &rest[split + 1..]),
        None => (XSD.as_bytes(), rest),
    };

    let schema_text = String::from_utf8_lossy(schema_bytes);
    let schema = serde_json::from_str(&schema_text)
        .unwrap_or_else(|_| serde_json::Value::String(schema_text.into_owned()));

    let record = ResponseRecord::new()
        .with_content(content.to_vec())
        .with_content_type(content_type)
        .with_schema(schema);

    // Must never panic; the verdict itself is not checked.
    let _ = is_valid(&record);
});
