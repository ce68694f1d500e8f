//! Content type → validation strategy.

/// Format-specific validation path chosen for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Parse the payload as JSON and check it against a JSON Schema.
    Json,
    /// Stream the payload through an XSD-validating reader.
    Xml,
    /// Wrap the payload in quotes and check the resulting JSON string.
    Text,
    /// Unsupported type: always valid.
    Permissive,
}

/// Ordered `(prefix, strategy)` pairs; the first match wins.
pub const DISPATCH_TABLE: &[(&str, Strategy)] = &[
    ("application/json", Strategy::Json),
    ("application/xml", Strategy::Xml),
    ("text/plain", Strategy::Text),
    ("text/html", Strategy::Text),
];

impl Strategy {
    /// Select a strategy by case-insensitive prefix. Parameters such as
    /// `charset` are not parsed.
    pub fn for_content_type(content_type: &str) -> Strategy {
        DISPATCH_TABLE
            .iter()
            .find(|(prefix, _)| starts_with_ignore_ascii_case(content_type, prefix))
            .map(|&(_, strategy)| strategy)
            .unwrap_or(Strategy::Permissive)
    }
}

fn starts_with_ignore_ascii_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prefix_match_ignores_case_and_parameters() {
        assert_eq!(
            Strategy::for_content_type("APPLICATION/JSON; charset=utf-8"),
            Strategy::Json
        );
        assert_eq!(Strategy::for_content_type("Application/Xml"), Strategy::Xml);
        assert_eq!(Strategy::for_content_type("text/HTML"), Strategy::Text);
    }

    #[test]
    fn test_prefix_is_not_a_subtype_match() {
        // "application/problem+json" does not start with "application/json".
        assert_eq!(
            Strategy::for_content_type("application/problem+json"),
            Strategy::Permissive
        );
        assert_eq!(
            Strategy::for_content_type("application/json-seq"),
            Strategy::Json
        );
    }

    #[test]
    fn test_leading_whitespace_is_not_trimmed() {
        assert_eq!(
            Strategy::for_content_type(" application/json"),
            Strategy::Permissive
        );
    }

    #[test]
    fn test_multibyte_input_shorter_than_prefix() {
        assert_eq!(Strategy::for_content_type("téxt"), Strategy::Permissive);
        assert_eq!(Strategy::for_content_type(""), Strategy::Permissive);
    }
}
