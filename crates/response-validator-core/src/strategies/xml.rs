//! `application/xml`: stream the payload through an XSD-validating reader.

use serde_json::Value;

use crate::config::ValidatorOptions;
use crate::error::ValidationError;
use crate::schema::compile_xml_schema;
use crate::xsd::ValidatingReader;

pub fn check(content: &str, schema: &Value, options: &ValidatorOptions) -> Result<(), ValidationError> {
    let schema_set = compile_xml_schema(schema, options)?;
    let mut reader = ValidatingReader::new(&schema_set, content);
    reader.read_to_end()
}
