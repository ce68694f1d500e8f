//! # response-validator-core
//!
//! Decide whether an API response payload conforms to the schema its
//! operation declares, choosing the validation path from the response's
//! content type:
//!
//! | Content type prefix            | Strategy                                   |
//! |--------------------------------|--------------------------------------------|
//! | `application/json`             | parse as JSON, check against JSON Schema   |
//! | `application/xml`              | stream through an XSD-validating reader    |
//! | `text/plain`, `text/html`      | check the text as a JSON string value      |
//! | anything else                  | valid                                      |
//!
//! The answer is a single boolean. A response without a schema or without a
//! content type is valid; a malformed payload or schema is not.
//!
//! ```
//! use response_validator_core::{is_valid, ResponseRecord};
//! use serde_json::json;
//!
//! let response = ResponseRecord::new()
//!     .with_content(r#"{"x":1}"#)
//!     .with_content_type("application/json; charset=utf-8")
//!     .with_schema(json!({ "type": "object", "required": ["x"] }));
//! assert!(is_valid(&response));
//! ```

pub mod config;
pub mod error;
pub mod media_type;
pub mod record;
pub mod schema;
pub mod strategies;
pub mod validator;
pub mod xsd;

pub use config::{JsonDraft, ValidatorOptions};
pub use error::ValidationError;
pub use media_type::Strategy;
pub use record::{Content, ResponseRecord};
pub use schema::{compile_json_schema, compile_xml_schema, render_schema_text};
pub use validator::{is_valid, Validator};
