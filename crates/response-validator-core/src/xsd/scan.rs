//! Namespace-aware event scanner over `quick-xml`.
//!
//! Layers the well-formedness rules the raw reader leaves to its caller on
//! top of the event stream: exactly one root element, no character data
//! outside it, no unclosed elements at end of input, every prefix bound,
//! only XML `Char`s in content, an XML declaration only as the first thing
//! in the document, and comments without `--`.

use std::collections::HashMap;
use std::rc::Rc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::model::QName;
use crate::error::ValidationError;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope namespace bindings. The empty prefix is the default namespace.
#[derive(Debug, Default, Clone)]
pub(crate) struct Namespaces {
    bindings: HashMap<String, String>,
}

impl Namespaces {
    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.bindings
            .get(prefix)
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve a lexical QName found in an attribute value (`type="xs:int"`).
    /// Unprefixed names take the default namespace.
    pub(crate) fn resolve_qname(&self, lexical: &str) -> Option<QName> {
        let lexical = lexical.trim();
        match lexical.split_once(':') {
            Some((prefix, local)) => self
                .resolve_prefix(prefix)
                .map(|ns| QName::new(Some(ns), local)),
            None => Some(QName::new(self.resolve_prefix(""), lexical)),
        }
    }
}

/// A start tag with its name and attributes resolved.
#[derive(Debug)]
pub(crate) struct Tag {
    pub name: QName,
    pub attributes: Vec<(QName, String)>,
    pub scope: Rc<Namespaces>,
}

#[derive(Debug)]
pub(crate) enum Item {
    Open(Tag),
    Text(String),
    Close,
    Eof,
}

pub(crate) struct Scanner<'a> {
    reader: Reader<&'a [u8]>,
    /// One scope per open element, plus the document scope at index 0.
    scopes: Vec<Rc<Namespaces>>,
    roots: usize,
    /// Events read so far; the XML declaration must be the first.
    events: usize,
    doctype: bool,
    pending_close: bool,
    malformed: fn(String) -> ValidationError,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(text: &'a str, malformed: fn(String) -> ValidationError) -> Self {
        Self {
            reader: Reader::from_str(text),
            scopes: vec![Rc::new(Namespaces::default())],
            roots: 0,
            events: 0,
            doctype: false,
            pending_close: false,
            malformed,
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub(crate) fn next_item(&mut self) -> Result<Item, ValidationError> {
        if self.pending_close {
            self.pending_close = false;
            self.scopes.pop();
            return Ok(Item::Close);
        }

        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => return Err(self.fail(e.to_string())),
            };
            self.events += 1;

            match event {
                Event::Start(start) => return self.open(&start).map(Item::Open),
                Event::Empty(start) => {
                    let tag = self.open(&start)?;
                    self.pending_close = true;
                    return Ok(Item::Open(tag));
                }
                Event::End(_) => {
                    if self.depth() == 0 {
                        return Err(self.fail("end tag without matching start tag".into()));
                    }
                    self.scopes.pop();
                    return Ok(Item::Close);
                }
                Event::Text(text) => {
                    let mut text = std::str::from_utf8(&text).map_err(|e| self.fail(e.to_string()))?;
                    if self.events == 1 {
                        if let Some(rest) = text.strip_prefix('\u{FEFF}') {
                            text = rest;
                            if text.is_empty() {
                                self.events = 0;
                                continue;
                            }
                        }
                    }
                    if text.contains("]]>") {
                        return Err(self.fail("']]>' in character data".into()));
                    }
                    self.check_chars(text, "character data")?;
                    if let Some(item) = self.character_data(text.to_owned())? {
                        return Ok(item);
                    }
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data).map_err(|e| self.fail(e.to_string()))?;
                    self.check_chars(text, "CDATA section")?;
                    if let Some(item) = self.character_data(text.to_owned())? {
                        return Ok(item);
                    }
                }
                Event::Decl(_) => {
                    if self.events > 1 {
                        return Err(self.fail(
                            "XML declaration is only allowed at the start of the document".into(),
                        ));
                    }
                }
                Event::PI(pi) => {
                    let body = std::str::from_utf8(&pi).map_err(|e| self.fail(e.to_string()))?;
                    let target = body
                        .split([' ', '\t', '\n', '\r'])
                        .next()
                        .unwrap_or_default();
                    if target.eq_ignore_ascii_case("xml") {
                        return Err(self.fail(format!("reserved processing instruction '{target}'")));
                    }
                    self.check_chars(body, "processing instruction")?;
                }
                Event::Comment(comment) => {
                    let body = std::str::from_utf8(&comment).map_err(|e| self.fail(e.to_string()))?;
                    if body.contains("--") || body.ends_with('-') {
                        return Err(self.fail("'--' inside a comment".into()));
                    }
                    self.check_chars(body, "comment")?;
                }
                Event::DocType(_) => {
                    if self.doctype || self.roots > 0 {
                        return Err(self.fail("misplaced document type declaration".into()));
                    }
                    self.doctype = true;
                }
                Event::GeneralRef(reference) => {
                    let text = self.resolve_reference(&reference)?;
                    if let Some(item) = self.character_data(text)? {
                        return Ok(item);
                    }
                }
                Event::Eof => {
                    if self.depth() > 0 {
                        return Err(self.fail(format!(
                            "unexpected end of input with {} unclosed element(s)",
                            self.depth()
                        )));
                    }
                    if self.roots == 0 {
                        return Err(self.fail("root element is missing".into()));
                    }
                    return Ok(Item::Eof);
                }
                _ => {}
            }
        }
    }

    fn fail(&self, message: String) -> ValidationError {
        (self.malformed)(format!(
            "{message} (at byte {})",
            self.reader.buffer_position()
        ))
    }

    fn check_chars(&self, text: &str, context: &str) -> Result<(), ValidationError> {
        match text.chars().find(|&c| !is_xml_char(c)) {
            Some(c) => Err(self.fail(format!(
                "character U+{:04X} is not allowed in {context}",
                c as u32
            ))),
            None => Ok(()),
        }
    }

    fn character_data(&self, text: String) -> Result<Option<Item>, ValidationError> {
        if self.depth() > 0 {
            return Ok(Some(Item::Text(text)));
        }
        if is_xml_whitespace(&text) {
            Ok(None)
        } else {
            Err(self.fail("character data outside the root element".into()))
        }
    }

    fn resolve_reference(
        &self,
        reference: &quick_xml::events::BytesRef<'_>,
    ) -> Result<String, ValidationError> {
        let name = std::str::from_utf8(reference).map_err(|e| self.fail(e.to_string()))?;
        resolve_entity(name)
            .map(String::from)
            .ok_or_else(|| self.fail(format!("undefined entity '&{name};'")))
    }

    fn open(&mut self, start: &BytesStart<'_>) -> Result<Tag, ValidationError> {
        if self.depth() == 0 {
            self.roots += 1;
            if self.roots > 1 {
                return Err(self.fail("document has more than one root element".into()));
            }
        }

        let mut declared = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| self.fail(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| self.fail(e.to_string()))?
                .to_owned();
            let raw = std::str::from_utf8(&attr.value).map_err(|e| self.fail(e.to_string()))?;
            let value = normalize_attribute(raw).map_err(|e| self.fail(e))?;

            if key == "xmlns" {
                declared.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(self.fail(format!("prefix '{prefix}' bound to empty namespace")));
                }
                declared.push((prefix.to_owned(), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        let parent = self.scopes.last().cloned().unwrap_or_default();
        let scope = if declared.is_empty() {
            parent
        } else {
            let mut scope = Namespaces::clone(&parent);
            scope.bindings.extend(declared);
            Rc::new(scope)
        };

        let raw_name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| self.fail(e.to_string()))?
            .to_owned();
        let name = scope
            .resolve_qname(&raw_name)
            .ok_or_else(|| self.fail(format!("unbound prefix in element '{raw_name}'")))?;

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (key, value) in raw_attributes {
            let name = match key.split_once(':') {
                Some((prefix, local)) => {
                    let ns = scope
                        .resolve_prefix(prefix)
                        .ok_or_else(|| self.fail(format!("unbound prefix in attribute '{key}'")))?;
                    QName::new(Some(ns), local)
                }
                // Unprefixed attributes never take the default namespace.
                None => QName::new(None, &key),
            };
            attributes.push((name, value));
        }

        self.scopes.push(Rc::clone(&scope));
        Ok(Tag {
            name,
            attributes,
            scope,
        })
    }
}

pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Character for a predefined entity or character reference name.
fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => {
            let code = match name.strip_prefix("#x") {
                Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                    u32::from_str_radix(hex, 16).ok()?
                }
                Some(_) => return None,
                None => {
                    let digits = name.strip_prefix('#')?;
                    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    digits.parse().ok()?
                }
            };
            char::from_u32(code).filter(|&c| is_xml_char(c))
        }
    }
}

/// Attribute-value normalization: literal whitespace becomes a space,
/// references are resolved.
fn normalize_attribute(raw: &str) -> Result<String, String> {
    if let Some(c) = raw.chars().find(|&c| !is_xml_char(c)) {
        return Err(format!(
            "character U+{:04X} is not allowed in attribute values",
            c as u32
        ));
    }
    let mut value = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find(['&', '<', '\t', '\n', '\r']) {
        value.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.as_bytes()[0] {
            b'&' => {
                let end = tail
                    .find(';')
                    .ok_or_else(|| format!("unterminated reference in '{raw}'"))?;
                let name = &tail[1..end];
                let ch = resolve_entity(name)
                    .ok_or_else(|| format!("undefined entity '&{name};'"))?;
                value.push(ch);
                rest = &tail[end + 1..];
            }
            b'<' => return Err(format!("'<' in attribute value '{raw}'")),
            _ => {
                value.push(' ');
                rest = &tail[1..];
            }
        }
    }
    value.push_str(rest);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(text: &str) -> Result<Vec<String>, ValidationError> {
        let mut scanner = Scanner::new(text, ValidationError::XmlMalformed);
        let mut trace = Vec::new();
        loop {
            match scanner.next_item()? {
                Item::Open(tag) => trace.push(format!("<{}>", tag.name)),
                Item::Text(text) => trace.push(text),
                Item::Close => trace.push("</>".into()),
                Item::Eof => return Ok(trace),
            }
        }
    }

    #[test]
    fn test_resolves_default_and_prefixed_namespaces() {
        let trace = drain(r#"<a xmlns="urn:a" xmlns:b="urn:b"><b:c/></a>"#).unwrap();
        assert_eq!(trace, vec!["<{urn:a}a>", "<{urn:b}c>", "</>", "</>"]);
    }

    #[test]
    fn test_entity_references_become_text() {
        let trace = drain("<a>x &amp; &#65;</a>").unwrap();
        assert_eq!(trace.concat(), "<a>x & A</>");
    }

    #[test]
    fn test_unclosed_root_is_malformed() {
        let err = drain("<root><x>1</x>").unwrap_err();
        assert!(matches!(err, ValidationError::XmlMalformed(_)), "{err}");
    }

    #[test]
    fn test_mismatched_end_tag_is_malformed() {
        assert!(drain("<root><x>1</y></root>").is_err());
    }

    #[test]
    fn test_missing_root_and_second_root() {
        assert!(drain("").is_err());
        assert!(drain("   ").is_err());
        assert!(drain("<a/><b/>").is_err());
    }

    #[test]
    fn test_text_outside_root() {
        assert!(drain("oops<a/>").is_err());
        assert!(drain("\n<a/>\n").is_ok());
    }

    #[test]
    fn test_attribute_values_are_normalized() {
        let mut scanner = Scanner::new("<a v=\"x&#x41;&lt;\ty\"/>", ValidationError::XmlMalformed);
        match scanner.next_item().unwrap() {
            Item::Open(tag) => assert_eq!(tag.attributes[0].1, "xA< y"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_undefined_entity() {
        assert!(drain("<a>&nbsp;</a>").is_err());
        assert!(drain("<a v='&bogus;'/>").is_err());
    }

    #[test]
    fn test_cdata_end_marker_in_text() {
        assert!(drain("<a>]]></a>").is_err());
        assert!(drain("<a>]]&gt;</a>").is_ok());
        assert!(drain("<a><![CDATA[x]]></a>").is_ok());
    }

    #[test]
    fn test_characters_outside_char_production() {
        assert!(drain("<a>\u{1}</a>").is_err());
        assert!(drain("<a><![CDATA[\u{1}]]></a>").is_err());
        assert!(drain("<a v='\u{8}'/>").is_err());
        assert!(drain("<a>\u{FFFE}</a>").is_err());
        assert!(drain("<a>tab\there \u{10000}</a>").is_ok());
    }

    #[test]
    fn test_character_references_outside_char_production() {
        assert!(drain("<a>&#0;</a>").is_err());
        assert!(drain("<a>&#x1;</a>").is_err());
        assert!(drain("<a>&#xD800;</a>").is_err());
        assert!(drain("<a>&#+65;</a>").is_err());
        assert!(drain("<a v='&#0;'/>").is_err());
        assert!(drain("<a>&#9;&#x10FFFF;</a>").is_ok());
    }

    #[test]
    fn test_xml_declaration_only_first() {
        assert!(drain(r#"<?xml version="1.0"?><a/>"#).is_ok());
        assert!(drain(r#"<a/><?xml version="1.0"?>"#).is_err());
        assert!(drain(r#"<?xml version="1.0"?><?xml version="1.0"?><a/>"#).is_err());
        assert!(drain(r#" <?xml version="1.0"?><a/>"#).is_err());
        assert!(drain(r#"<a><?XML x?></a>"#).is_err());
        assert!(drain(r#"<a><?target data?></a>"#).is_ok());
    }

    #[test]
    fn test_double_hyphen_in_comment() {
        assert!(drain("<a/><!-- bad -- comment -->").is_err());
        assert!(drain("<a><!-- trailing ---></a>").is_err());
        assert!(drain("<!-- fine - comment --><a/>").is_ok());
    }

    #[test]
    fn test_doctype_placement() {
        assert!(drain("<!DOCTYPE a><a/>").is_ok());
        assert!(drain("<a/><!DOCTYPE a>").is_err());
        assert!(drain("<!DOCTYPE a><!DOCTYPE a><a/>").is_err());
    }

    #[test]
    fn test_unbound_prefix() {
        assert!(drain("<p:a/>").is_err());
    }
}
