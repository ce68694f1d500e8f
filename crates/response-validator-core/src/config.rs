//! Validator configuration.

use serde::{Deserialize, Serialize};

/// JSON Schema draft used to compile the expected schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JsonDraft {
    /// Detect from `$schema`, falling back to the engine default.
    #[default]
    Auto,
    Draft4,
    Draft6,
    Draft7,
    #[serde(rename = "draft2019-09")]
    Draft201909,
    #[serde(rename = "draft2020-12")]
    Draft202012,
}

impl JsonDraft {
    pub(crate) fn engine_draft(self) -> Option<jsonschema::Draft> {
        match self {
            JsonDraft::Auto => None,
            JsonDraft::Draft4 => Some(jsonschema::Draft::Draft4),
            JsonDraft::Draft6 => Some(jsonschema::Draft::Draft6),
            JsonDraft::Draft7 => Some(jsonschema::Draft::Draft7),
            JsonDraft::Draft201909 => Some(jsonschema::Draft::Draft201909),
            JsonDraft::Draft202012 => Some(jsonschema::Draft::Draft202012),
        }
    }
}

/// Options shared by every validation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Draft used for JSON and text payloads.
    pub json_draft: JsonDraft,
    /// Treat `format` as an assertion instead of an annotation.
    pub validate_formats: bool,
    /// Recursion limit while compiling schemas (type derivation, group nesting).
    pub max_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            json_draft: JsonDraft::Auto,
            validate_formats: false,
            max_depth: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_partial_options_fill_defaults() {
        let options: ValidatorOptions =
            serde_json::from_value(json!({ "json_draft": "draft7" })).unwrap();
        assert_eq!(options.json_draft, JsonDraft::Draft7);
        assert_eq!(options.max_depth, 128);
        assert!(!options.validate_formats);
    }

    #[test]
    fn test_dated_draft_names() {
        let draft: JsonDraft = serde_json::from_value(json!("draft2020-12")).unwrap();
        assert_eq!(draft, JsonDraft::Draft202012);
        assert_eq!(draft.engine_draft(), Some(jsonschema::Draft::Draft202012));
        assert_eq!(JsonDraft::Auto.engine_draft(), None);
    }
}
