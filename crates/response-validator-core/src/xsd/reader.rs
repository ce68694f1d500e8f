//! Schema-validating XML reader.

use std::sync::Arc;

use super::model::{
    ComplexType, ContentModel, ElementDecl, ProcessContents, QName, SchemaSet, TypeDef, TypeRef,
    XSI_NS,
};
use super::particle::{ElementParticle, Matched, Term};
use super::scan::{is_xml_whitespace, Item, Scanner, Tag};
use super::simple::SimpleType;
use crate::error::ValidationError;

#[derive(Debug)]
enum Content {
    Elements { term: Term, mixed: bool },
    Simple { simple: Arc<SimpleType>, text: String },
    Empty { mixed: bool },
    Nil,
    /// Wildcard or `anyType` content: accepted without checks.
    Skip,
}

#[derive(Debug)]
struct Frame {
    name: QName,
    decl: Option<Arc<ElementDecl>>,
    content: Content,
}

/// Streams one document against a [`SchemaSet`], stopping at the first
/// violation.
///
/// The reader holds its own handle on the schema set plus the frame stack of
/// open elements; both are released when the reader is dropped, whichever
/// way `read_to_end` returned.
pub struct ValidatingReader<'a> {
    schema: Arc<SchemaSet>,
    scanner: Scanner<'a>,
    frames: Vec<Frame>,
}

impl<'a> ValidatingReader<'a> {
    pub fn new(schema: &Arc<SchemaSet>, document: &'a str) -> Self {
        Self {
            schema: Arc::clone(schema),
            scanner: Scanner::new(document, ValidationError::XmlMalformed),
            frames: Vec::new(),
        }
    }

    /// Consume the whole document.
    pub fn read_to_end(&mut self) -> Result<(), ValidationError> {
        loop {
            match self.scanner.next_item()? {
                Item::Open(tag) => self.open(tag)?,
                Item::Text(text) => self.text(&text)?,
                Item::Close => self.close()?,
                Item::Eof => return Ok(()),
            }
        }
    }

    fn path(&self) -> String {
        let mut path = String::new();
        for frame in &self.frames {
            path.push('/');
            path.push_str(&frame.name.local);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    fn violation(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::xml_violation(self.path(), message)
    }

    fn open(&mut self, tag: Tag) -> Result<(), ValidationError> {
        let decl = match self.frames.last_mut() {
            None => match self.schema.elements.get(&tag.name) {
                Some(decl) => Some(Arc::clone(decl)),
                None => {
                    return Err(self.violation(format!(
                        "no global declaration for root element '{}'",
                        tag.name
                    )))
                }
            },
            Some(frame) => match &mut frame.content {
                Content::Elements { term, .. } => match term.derive(&tag.name) {
                    Some((rest, matched)) => {
                        *term = rest;
                        self.matched_decl(&tag.name, matched)?
                    }
                    None => {
                        let expected = term.expected();
                        let message = if expected.is_empty() {
                            format!("unexpected element '{}'; no more elements allowed", tag.name)
                        } else {
                            format!(
                                "unexpected element '{}'; expected one of [{}]",
                                tag.name,
                                expected.join(", ")
                            )
                        };
                        return Err(self.violation(message));
                    }
                },
                Content::Skip => None,
                Content::Simple { .. } | Content::Empty { .. } | Content::Nil => {
                    return Err(self.violation(format!(
                        "element '{}' is not allowed in this content",
                        tag.name
                    )))
                }
            },
        };

        let content = match decl {
            Some(ref decl) => self.element_content(decl, &tag)?,
            None => Content::Skip,
        };
        self.frames.push(Frame {
            name: tag.name,
            decl,
            content,
        });
        Ok(())
    }

    /// Declaration to validate a matched child against; `None` means skip it.
    fn matched_decl(
        &self,
        name: &QName,
        matched: Matched,
    ) -> Result<Option<Arc<ElementDecl>>, ValidationError> {
        match matched {
            Matched::Element(ElementParticle::Local(decl)) => Ok(Some(decl)),
            Matched::Element(ElementParticle::Global(global)) => {
                Ok(self.schema.elements.get(&global).cloned())
            }
            Matched::Wildcard(wildcard) => match wildcard.process {
                ProcessContents::Skip => Ok(None),
                ProcessContents::Lax => Ok(self.schema.elements.get(name).cloned()),
                ProcessContents::Strict => match self.schema.elements.get(name) {
                    Some(decl) => Ok(Some(Arc::clone(decl))),
                    None => Err(self.violation(format!(
                        "no global declaration for wildcard element '{name}'"
                    ))),
                },
            },
        }
    }

    fn element_content(&self, decl: &ElementDecl, tag: &Tag) -> Result<Content, ValidationError> {
        let xsi = |local: &str| {
            tag.attributes
                .iter()
                .find(|(name, _)| {
                    name.namespace.as_deref() == Some(XSI_NS) && name.local == local
                })
                .map(|(_, value)| value.trim())
        };

        let type_ref = match xsi("type") {
            Some(lexical) => {
                let name = tag.scope.resolve_qname(lexical).ok_or_else(|| {
                    self.violation(format!("unbound prefix in xsi:type '{lexical}'"))
                })?;
                // No named type derives from an anonymous one.
                let derives = match &decl.type_ref {
                    TypeRef::Named(declared) => self.schema.derives_from(&name, declared),
                    TypeRef::Anonymous(_) => false,
                };
                if !derives {
                    return Err(self.violation(format!(
                        "xsi:type '{name}' is not derived from the declared type of '{}'",
                        decl.name
                    )));
                }
                TypeRef::Named(name)
            }
            None => decl.type_ref.clone(),
        };
        let def = self.schema.resolve(&type_ref).ok_or_else(|| {
            self.violation(format!("type of element '{}' is not declared", decl.name))
        })?;

        let nil = matches!(xsi("nil"), Some("true" | "1"));
        if nil && !decl.nillable {
            return Err(self.violation(format!("element '{}' is not nillable", decl.name)));
        }

        let content = match def {
            TypeDef::Simple(simple) => {
                self.check_attributes(&ComplexType::empty(false), tag)?;
                Content::Simple {
                    simple,
                    text: String::new(),
                }
            }
            TypeDef::Complex(complex) => {
                self.check_attributes(&complex, tag)?;
                match &complex.content {
                    ContentModel::Empty => Content::Empty {
                        mixed: complex.mixed,
                    },
                    ContentModel::Simple(simple) => Content::Simple {
                        simple: Arc::clone(simple),
                        text: String::new(),
                    },
                    ContentModel::Elements(term) => Content::Elements {
                        term: term.clone(),
                        mixed: complex.mixed,
                    },
                    ContentModel::Any => Content::Skip,
                }
            }
        };
        Ok(if nil { Content::Nil } else { content })
    }

    fn check_attributes(&self, complex: &ComplexType, tag: &Tag) -> Result<(), ValidationError> {
        for (name, value) in &tag.attributes {
            if name.namespace.as_deref() == Some(XSI_NS) {
                continue;
            }
            match complex.attributes.iter().find(|attr| &attr.name == name) {
                Some(attr) => {
                    attr.simple.validate(value).map_err(|e| {
                        self.violation(format!("attribute '{name}' of '{}': {e}", tag.name))
                    })?;
                    if let Some(fixed) = &attr.fixed {
                        if !attr.simple.same_value(value, fixed) {
                            return Err(self.violation(format!(
                                "attribute '{name}' must have fixed value '{fixed}'"
                            )));
                        }
                    }
                }
                None if complex.any_attribute => {}
                None => {
                    return Err(self.violation(format!(
                        "attribute '{name}' is not declared for '{}'",
                        tag.name
                    )))
                }
            }
        }

        for attr in complex.attributes.iter().filter(|attr| attr.required) {
            if !tag.attributes.iter().any(|(name, _)| name == &attr.name) {
                return Err(self.violation(format!(
                    "required attribute '{}' is missing on '{}'",
                    attr.name, tag.name
                )));
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), ValidationError> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(());
        };
        let allowed = match &mut frame.content {
            Content::Simple { text: buffer, .. } => {
                buffer.push_str(text);
                true
            }
            Content::Elements { mixed, .. } | Content::Empty { mixed } => {
                *mixed || is_xml_whitespace(text)
            }
            Content::Nil => is_xml_whitespace(text),
            Content::Skip => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(self.violation(format!("text content is not allowed: '{}'", text.trim())))
        }
    }

    fn close(&mut self) -> Result<(), ValidationError> {
        let result = match self.frames.last() {
            Some(frame) => self.check_complete(frame),
            None => Ok(()),
        };
        self.frames.pop();
        result
    }

    fn check_complete(&self, frame: &Frame) -> Result<(), ValidationError> {
        match &frame.content {
            Content::Elements { term, .. } if !term.nullable() => {
                Err(self.violation(format!(
                    "content of '{}' is incomplete; expected one of [{}]",
                    frame.name,
                    term.expected().join(", ")
                )))
            }
            Content::Simple { simple, text } => {
                let decl = frame.decl.as_deref();
                // An empty element takes the declared default, or the fixed value.
                let value = match decl.and_then(|d| d.default.as_deref().or(d.fixed.as_deref())) {
                    Some(implied) if text.is_empty() => implied,
                    _ => text.as_str(),
                };
                simple
                    .validate(value)
                    .map_err(|e| self.violation(format!("value of '{}': {e}", frame.name)))?;
                if let Some(fixed) = decl.and_then(|d| d.fixed.as_deref()) {
                    if !text.is_empty() && !simple.same_value(value, fixed) {
                        return Err(self.violation(format!(
                            "'{}' must have fixed value '{fixed}'",
                            frame.name
                        )));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Drop for ValidatingReader<'_> {
    fn drop(&mut self) {
        tracing::trace!(
            open_elements = self.frames.len(),
            "releasing validating reader"
        );
    }
}
