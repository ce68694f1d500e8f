//! Compiled schema components.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::particle::Term;
use super::simple::{Builtin, SimpleType};

pub(crate) const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub(crate) const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Expanded name: namespace URI (if any) plus local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            local: local.to_owned(),
        }
    }

    pub(crate) fn xsd(local: &str) -> Self {
        Self::new(Some(XSD_NS), local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// A compiled set of schema components for one target namespace.
///
/// Built-in types are registered up front so every named type reference
/// resolves through the same table.
#[derive(Debug)]
pub struct SchemaSet {
    pub(crate) target_namespace: Option<String>,
    pub(crate) elements: HashMap<QName, Arc<ElementDecl>>,
    pub(crate) types: HashMap<QName, TypeDef>,
    /// Base type of each named user type, for `xsi:type` checks.
    pub(crate) bases: HashMap<QName, QName>,
}

impl SchemaSet {
    pub(crate) fn with_builtins(target_namespace: Option<String>) -> Self {
        let mut types: HashMap<QName, TypeDef> = Builtin::ALL
            .iter()
            .map(|&builtin| {
                (
                    QName::xsd(builtin.local_name()),
                    TypeDef::Simple(Arc::new(SimpleType::atomic(builtin))),
                )
            })
            .collect();
        types.insert(
            QName::xsd("anyType"),
            TypeDef::Complex(Arc::new(ComplexType::any())),
        );

        Self {
            target_namespace,
            elements: HashMap::new(),
            types,
            bases: HashMap::new(),
        }
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Names of the global element declarations, sorted.
    pub fn global_elements(&self) -> Vec<&QName> {
        let mut names: Vec<_> = self.elements.keys().collect();
        names.sort();
        names
    }

    fn base_of(&self, name: &QName) -> Option<QName> {
        if let Some(base) = self.bases.get(name) {
            return Some(base.clone());
        }
        if name.namespace.as_deref() != Some(XSD_NS) {
            return None;
        }
        match name.local.as_str() {
            "anyType" => None,
            "anySimpleType" => Some(QName::xsd("anyType")),
            local => Builtin::from_local(local).map(|b| QName::xsd(b.base().local_name())),
        }
    }

    /// Whether `derived` is `base` or reaches it through its base chain.
    /// Everything derives from `anyType`.
    pub(crate) fn derives_from(&self, derived: &QName, base: &QName) -> bool {
        if *base == QName::xsd("anyType") {
            return true;
        }
        let mut current = derived.clone();
        // A chain can be no longer than the number of named types.
        for _ in 0..=self.types.len() {
            if current == *base {
                return true;
            }
            match self.base_of(&current) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    pub(crate) fn resolve(&self, type_ref: &TypeRef) -> Option<TypeDef> {
        match type_ref {
            TypeRef::Named(name) => self.types.get(name).cloned(),
            TypeRef::Anonymous(def) => Some(def.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TypeDef {
    Simple(Arc<SimpleType>),
    Complex(Arc<ComplexType>),
}

/// Element types stay named until validation so recursive types compile.
#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    Named(QName),
    Anonymous(TypeDef),
}

#[derive(Debug)]
pub(crate) struct ElementDecl {
    pub name: QName,
    pub type_ref: TypeRef,
    pub nillable: bool,
    pub default: Option<String>,
    pub fixed: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum ContentModel {
    Empty,
    Simple(Arc<SimpleType>),
    Elements(Term),
    /// `xs:anyType`: any attributes, any children, any text.
    Any,
}

#[derive(Debug, Clone)]
pub(crate) struct ComplexType {
    pub content: ContentModel,
    pub attributes: Vec<AttributeUse>,
    pub any_attribute: bool,
    pub mixed: bool,
}

impl ComplexType {
    pub(crate) fn empty(mixed: bool) -> Self {
        Self {
            content: ContentModel::Empty,
            attributes: Vec::new(),
            any_attribute: false,
            mixed,
        }
    }

    pub(crate) fn any() -> Self {
        Self {
            content: ContentModel::Any,
            attributes: Vec::new(),
            any_attribute: true,
            mixed: true,
        }
    }

    /// Insert or replace an attribute use by name.
    pub(crate) fn put_attribute(&mut self, attribute: AttributeUse) {
        self.remove_attribute(&attribute.name);
        self.attributes.push(attribute);
    }

    pub(crate) fn remove_attribute(&mut self, name: &QName) {
        self.attributes.retain(|existing| &existing.name != name);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AttributeUse {
    pub name: QName,
    pub simple: Arc<SimpleType>,
    pub required: bool,
    pub fixed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessContents {
    Strict,
    Lax,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NamespaceConstraint {
    Any,
    /// Any namespace except the given target namespace and no-namespace.
    Other(Option<String>),
    Enumerated(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Wildcard {
    pub namespaces: NamespaceConstraint,
    pub process: ProcessContents,
}

impl Wildcard {
    pub(crate) fn allows(&self, namespace: Option<&str>) -> bool {
        match &self.namespaces {
            NamespaceConstraint::Any => true,
            NamespaceConstraint::Other(target) => {
                namespace.is_some() && namespace != target.as_deref()
            }
            NamespaceConstraint::Enumerated(allowed) => {
                allowed.iter().any(|ns| ns.as_deref() == namespace)
            }
        }
    }
}
