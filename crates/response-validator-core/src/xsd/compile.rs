//! XSD text → [`SchemaSet`].
//!
//! Two phases: the schema document is read into a plain element tree and its
//! global components are indexed by name; components are then compiled on
//! demand so forward references and recursive element types work.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use super::model::{
    AttributeUse, ComplexType, ContentModel, ElementDecl, NamespaceConstraint, ProcessContents,
    QName, SchemaSet, TypeDef, TypeRef, Wildcard, XSD_NS,
};
use super::particle::{ElementParticle, Term};
use super::scan::{Item, Namespaces, Scanner};
use super::simple::{Builtin, Facets, SimpleType, Variety};
use crate::error::ValidationError;

type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Debug)]
struct Node {
    name: QName,
    attributes: Vec<(QName, String)>,
    scope: Rc<Namespaces>,
    children: Vec<Node>,
}

impl Node {
    fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.namespace.is_none() && name.local == local)
            .map(|(_, value)| value.as_str())
    }

    fn local(&self) -> &str {
        &self.name.local
    }

    /// Schema children, skipping annotations.
    fn components(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|child| child.local() != "annotation")
    }

    fn qname_attr(&self, local: &str) -> Result<Option<QName>> {
        self.attr(local)
            .map(|lexical| {
                self.scope.resolve_qname(lexical).ok_or_else(|| {
                    ValidationError::xsd_compile(format!("unbound prefix in {local}=\"{lexical}\""))
                })
            })
            .transpose()
    }

    fn required_attr(&self, local: &str) -> Result<&str> {
        self.attr(local).ok_or_else(|| {
            ValidationError::xsd_compile(format!("<{}> is missing '{local}'", self.local()))
        })
    }
}

fn parse_tree(text: &str) -> Result<Node> {
    let mut scanner = Scanner::new(text, ValidationError::XsdParse);
    let mut stack: Vec<Node> = Vec::new();
    loop {
        match scanner.next_item()? {
            Item::Open(tag) => stack.push(Node {
                name: tag.name,
                attributes: tag.attributes,
                scope: tag.scope,
                children: Vec::new(),
            }),
            Item::Close => {
                let node = stack
                    .pop()
                    .ok_or_else(|| ValidationError::XsdParse("unbalanced end tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        // The scanner rejects anything after the root but trailing
                        // misc, so the root is complete once it closes.
                        while !matches!(scanner.next_item()?, Item::Eof) {}
                        return Ok(node);
                    }
                }
            }
            Item::Text(_) => {}
            Item::Eof => return Err(ValidationError::XsdParse("root element is missing".into())),
        }
    }
}

/// Parse and compile XSD markup.
pub fn compile_schema(text: &str, max_depth: usize) -> Result<SchemaSet> {
    let root = parse_tree(text)?;
    if root.name != QName::xsd("schema") {
        return Err(ValidationError::xsd_compile(format!(
            "document element is {}, expected {{{XSD_NS}}}schema",
            root.name
        )));
    }
    Compiler::index(&root, max_depth)?.finish()
}

struct Compiler<'n> {
    target_namespace: Option<String>,
    elements_qualified: bool,
    attributes_qualified: bool,
    max_depth: usize,
    elements: HashMap<QName, &'n Node>,
    types: HashMap<QName, &'n Node>,
    groups: HashMap<QName, &'n Node>,
    attribute_groups: HashMap<QName, &'n Node>,
    attributes: HashMap<QName, &'n Node>,
    compiled: HashMap<QName, TypeDef>,
    bases: HashMap<QName, QName>,
}

impl<'n> Compiler<'n> {
    fn index(root: &'n Node, max_depth: usize) -> Result<Self> {
        let target_namespace = root
            .attr("targetNamespace")
            .filter(|ns| !ns.is_empty())
            .map(str::to_owned);
        let mut compiler = Compiler {
            elements_qualified: root.attr("elementFormDefault") == Some("qualified"),
            attributes_qualified: root.attr("attributeFormDefault") == Some("qualified"),
            target_namespace,
            max_depth,
            elements: HashMap::new(),
            types: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            attributes: HashMap::new(),
            compiled: HashMap::new(),
            bases: HashMap::new(),
        };

        for node in root.components() {
            let table = match node.local() {
                "element" => &mut compiler.elements,
                "complexType" | "simpleType" => &mut compiler.types,
                "group" => &mut compiler.groups,
                "attributeGroup" => &mut compiler.attribute_groups,
                "attribute" => &mut compiler.attributes,
                other => {
                    return Err(ValidationError::xsd_compile(format!(
                        "unsupported top-level <{other}>"
                    )))
                }
            };
            let name = QName::new(
                compiler.target_namespace.as_deref(),
                node.required_attr("name")?,
            );
            if table.insert(name.clone(), node).is_some() {
                return Err(ValidationError::xsd_compile(format!(
                    "duplicate global <{}> '{name}'",
                    node.local()
                )));
            }
        }
        Ok(compiler)
    }

    fn finish(mut self) -> Result<SchemaSet> {
        let mut set = SchemaSet::with_builtins(self.target_namespace.clone());

        let mut type_names: Vec<QName> = self.types.keys().cloned().collect();
        type_names.sort();
        for name in type_names {
            self.named_type(&name, 0)?;
        }

        let mut element_names: Vec<(QName, &'n Node)> =
            self.elements.iter().map(|(k, v)| (k.clone(), *v)).collect();
        element_names.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, node) in element_names {
            let decl = self.element_decl(node, name.clone(), 0)?;
            set.elements.insert(name, Arc::new(decl));
        }

        set.types.extend(self.compiled);
        set.bases = self.bases;
        Ok(set)
    }

    fn guard(&self, depth: usize, what: &dyn std::fmt::Display) -> Result<()> {
        if depth > self.max_depth {
            return Err(ValidationError::DepthExceeded {
                path: what.to_string(),
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn type_exists(&self, name: &QName) -> Result<()> {
        let builtin = name.namespace.as_deref() == Some(XSD_NS)
            && (name.local == "anyType" || Builtin::from_local(&name.local).is_some());
        if builtin || self.types.contains_key(name) {
            Ok(())
        } else {
            Err(ValidationError::xsd_compile(format!("type '{name}' is not declared")))
        }
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn named_type(&mut self, name: &QName, depth: usize) -> Result<TypeDef> {
        if name.namespace.as_deref() == Some(XSD_NS) {
            if name.local == "anyType" {
                return Ok(TypeDef::Complex(Arc::new(ComplexType::any())));
            }
            if let Some(builtin) = Builtin::from_local(&name.local) {
                return Ok(TypeDef::Simple(Arc::new(SimpleType::atomic(builtin))));
            }
        }
        if let Some(done) = self.compiled.get(name) {
            return Ok(done.clone());
        }
        let node = *self
            .types
            .get(name)
            .ok_or_else(|| ValidationError::xsd_compile(format!("type '{name}' is not declared")))?;
        self.guard(depth, name)?;

        let def = self.type_def(node, depth + 1)?;
        self.compiled.insert(name.clone(), def.clone());
        self.bases.insert(name.clone(), declared_base(node)?);
        Ok(def)
    }

    fn named_simple(&mut self, name: &QName, depth: usize) -> Result<Arc<SimpleType>> {
        match self.named_type(name, depth)? {
            TypeDef::Simple(simple) => Ok(simple),
            TypeDef::Complex(_) => Err(ValidationError::xsd_compile(format!(
                "'{name}' is a complex type where a simple type is required"
            ))),
        }
    }

    fn type_def(&mut self, node: &'n Node, depth: usize) -> Result<TypeDef> {
        match node.local() {
            "complexType" => Ok(TypeDef::Complex(Arc::new(self.complex_type(node, depth)?))),
            "simpleType" => Ok(TypeDef::Simple(Arc::new(self.simple_type(node, depth)?))),
            other => Err(ValidationError::xsd_compile(format!(
                "<{other}> is not a type definition"
            ))),
        }
    }

    fn simple_type(&mut self, node: &'n Node, depth: usize) -> Result<SimpleType> {
        self.guard(depth, &"simpleType")?;
        let derivation = node.components().next().ok_or_else(|| {
            ValidationError::xsd_compile("<simpleType> needs restriction, list or union")
        })?;

        match derivation.local() {
            "restriction" => {
                let base = self.simple_base(derivation, depth)?;
                let facets = self.facets(derivation, &base)?;
                Ok(SimpleType {
                    variety: Variety::Restriction(base),
                    facets,
                })
            }
            "list" => {
                let item = match derivation.qname_attr("itemType")? {
                    Some(name) => self.named_simple(&name, depth + 1)?,
                    None => self.inline_simple(derivation, depth)?.ok_or_else(|| {
                        ValidationError::xsd_compile("<list> needs itemType or a simpleType")
                    })?,
                };
                Ok(SimpleType {
                    variety: Variety::List(item),
                    facets: Facets::default(),
                })
            }
            "union" => {
                let mut members = Vec::new();
                for lexical in derivation
                    .attr("memberTypes")
                    .unwrap_or_default()
                    .split_whitespace()
                {
                    let name = derivation.scope.resolve_qname(lexical).ok_or_else(|| {
                        ValidationError::xsd_compile(format!("unbound prefix in '{lexical}'"))
                    })?;
                    members.push(self.named_simple(&name, depth + 1)?);
                }
                for child in derivation.components() {
                    members.push(Arc::new(self.simple_type(child, depth + 1)?));
                }
                if members.is_empty() {
                    return Err(ValidationError::xsd_compile("<union> has no member types"));
                }
                Ok(SimpleType {
                    variety: Variety::Union(members),
                    facets: Facets::default(),
                })
            }
            other => Err(ValidationError::xsd_compile(format!(
                "unsupported <{other}> in <simpleType>"
            ))),
        }
    }

    fn inline_simple(&mut self, node: &'n Node, depth: usize) -> Result<Option<Arc<SimpleType>>> {
        match node.components().find(|child| child.local() == "simpleType") {
            Some(child) => Ok(Some(Arc::new(self.simple_type(child, depth + 1)?))),
            None => Ok(None),
        }
    }

    fn simple_base(&mut self, restriction: &'n Node, depth: usize) -> Result<Arc<SimpleType>> {
        match restriction.qname_attr("base")? {
            Some(name) => self.named_simple(&name, depth + 1),
            None => self.inline_simple(restriction, depth)?.ok_or_else(|| {
                ValidationError::xsd_compile("<restriction> needs a base or a simpleType")
            }),
        }
    }

    /// Facets of a restriction. Attribute declarations are left to the caller.
    fn facets(&self, restriction: &'n Node, base: &SimpleType) -> Result<Facets> {
        let primitive = base.primitive();
        let mut facets = Facets::default();
        for child in restriction.components() {
            match child.local() {
                "simpleType" | "attribute" | "attributeGroup" | "anyAttribute" => continue,
                facet => {
                    let value = child.required_attr("value")?;
                    let known = facets
                        .add(facet, value, primitive)
                        .map_err(ValidationError::XsdCompile)?;
                    if !known {
                        return Err(ValidationError::xsd_compile(format!(
                            "unsupported facet <{facet}>"
                        )));
                    }
                }
            }
        }
        Ok(facets)
    }

    fn complex_type(&mut self, node: &'n Node, depth: usize) -> Result<ComplexType> {
        self.guard(depth, &"complexType")?;
        let mut complex = ComplexType::empty(bool_attr(node, "mixed"));

        for child in node.components() {
            match child.local() {
                "sequence" | "choice" | "all" | "group" => {
                    complex.content = ContentModel::Elements(self.particle(child, depth + 1)?);
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.attribute_item(child, &mut complex, depth + 1)?;
                }
                "simpleContent" => self.simple_content(child, &mut complex, depth + 1)?,
                "complexContent" => self.complex_content(child, &mut complex, depth + 1)?,
                other => {
                    return Err(ValidationError::xsd_compile(format!(
                        "unsupported <{other}> in <complexType>"
                    )))
                }
            }
        }
        Ok(complex)
    }

    fn derivation<'a>(&self, content: &'a Node) -> Result<&'a Node> {
        content
            .components()
            .find(|child| matches!(child.local(), "extension" | "restriction"))
            .ok_or_else(|| {
                ValidationError::xsd_compile(format!(
                    "<{}> needs an extension or restriction",
                    content.local()
                ))
            })
    }

    fn simple_content(
        &mut self,
        content: &'n Node,
        complex: &mut ComplexType,
        depth: usize,
    ) -> Result<()> {
        let derivation = self.derivation(content)?;
        let base_name = derivation
            .qname_attr("base")?
            .ok_or_else(|| ValidationError::xsd_compile("simple content derivation needs a base"))?;

        let base_simple = match self.named_type(&base_name, depth + 1)? {
            TypeDef::Simple(simple) => simple,
            TypeDef::Complex(base) => {
                complex.attributes = base.attributes.clone();
                complex.any_attribute = base.any_attribute;
                match &base.content {
                    ContentModel::Simple(simple) => simple.clone(),
                    _ => {
                        return Err(ValidationError::xsd_compile(format!(
                            "simple content base '{base_name}' does not have simple content"
                        )))
                    }
                }
            }
        };

        let simple = if derivation.local() == "restriction" {
            let facets = self.facets(derivation, &base_simple)?;
            Arc::new(SimpleType {
                variety: Variety::Restriction(base_simple),
                facets,
            })
        } else {
            base_simple
        };
        complex.content = ContentModel::Simple(simple);
        self.derivation_attributes(derivation, complex, depth)
    }

    fn complex_content(
        &mut self,
        content: &'n Node,
        complex: &mut ComplexType,
        depth: usize,
    ) -> Result<()> {
        let derivation = self.derivation(content)?;
        if bool_attr(content, "mixed") {
            complex.mixed = true;
        }
        let base_name = derivation
            .qname_attr("base")?
            .ok_or_else(|| ValidationError::xsd_compile("complex content derivation needs a base"))?;

        let own = derivation
            .components()
            .find(|child| matches!(child.local(), "sequence" | "choice" | "all" | "group"))
            .map(|child| self.particle(child, depth + 1))
            .transpose()?;

        let base = if base_name == QName::xsd("anyType") {
            ComplexType::empty(false)
        } else {
            match self.named_type(&base_name, depth + 1)? {
                TypeDef::Complex(base) => ComplexType::clone(&base),
                TypeDef::Simple(_) => {
                    return Err(ValidationError::xsd_compile(format!(
                        "complex content base '{base_name}' is a simple type"
                    )))
                }
            }
        };

        if derivation.local() == "extension" {
            complex.content = match (base.content, own) {
                (ContentModel::Elements(inherited), Some(own)) => {
                    ContentModel::Elements(Term::seq(vec![inherited, own]))
                }
                (ContentModel::Elements(inherited), None) => ContentModel::Elements(inherited),
                (ContentModel::Empty, Some(own)) => ContentModel::Elements(own),
                (ContentModel::Empty, None) => ContentModel::Empty,
                (ContentModel::Any, _) => ContentModel::Any,
                (ContentModel::Simple(_), _) => {
                    return Err(ValidationError::xsd_compile(format!(
                        "cannot extend simple content of '{base_name}' with complexContent"
                    )))
                }
            };
            complex.mixed |= base.mixed;
        } else {
            complex.content = own.map_or(ContentModel::Empty, ContentModel::Elements);
        }
        complex.attributes = base.attributes;
        complex.any_attribute = base.any_attribute;
        self.derivation_attributes(derivation, complex, depth)
    }

    fn derivation_attributes(
        &mut self,
        derivation: &'n Node,
        complex: &mut ComplexType,
        depth: usize,
    ) -> Result<()> {
        for child in derivation.components() {
            if matches!(child.local(), "attribute" | "attributeGroup" | "anyAttribute") {
                self.attribute_item(child, complex, depth + 1)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    fn attribute_item(
        &mut self,
        node: &'n Node,
        complex: &mut ComplexType,
        depth: usize,
    ) -> Result<()> {
        self.guard(depth, &"attribute")?;
        match node.local() {
            "anyAttribute" => complex.any_attribute = true,
            "attributeGroup" => {
                let name = node.qname_attr("ref")?.ok_or_else(|| {
                    ValidationError::xsd_compile("local <attributeGroup> needs 'ref'")
                })?;
                let group = *self.attribute_groups.get(&name).ok_or_else(|| {
                    ValidationError::xsd_compile(format!("attributeGroup '{name}' is not declared"))
                })?;
                for child in group.components() {
                    self.attribute_item(child, complex, depth + 1)?;
                }
            }
            "attribute" => {
                let (name, declaration) = match node.qname_attr("ref")? {
                    Some(name) => {
                        let global = *self.attributes.get(&name).ok_or_else(|| {
                            ValidationError::xsd_compile(format!("attribute '{name}' is not declared"))
                        })?;
                        (name, global)
                    }
                    None => {
                        let qualified = match node.attr("form") {
                            Some(form) => form == "qualified",
                            None => self.attributes_qualified,
                        };
                        let namespace = if qualified {
                            self.target_namespace.as_deref()
                        } else {
                            None
                        };
                        (QName::new(namespace, node.required_attr("name")?), node)
                    }
                };

                if node.attr("use") == Some("prohibited") {
                    complex.remove_attribute(&name);
                    return Ok(());
                }

                let simple = match declaration.qname_attr("type")? {
                    Some(type_name) => self.named_simple(&type_name, depth + 1)?,
                    None => match self.inline_simple(declaration, depth)? {
                        Some(simple) => simple,
                        None => Arc::new(SimpleType::atomic(Builtin::AnySimpleType)),
                    },
                };
                complex.put_attribute(AttributeUse {
                    name,
                    simple,
                    required: node.attr("use") == Some("required"),
                    fixed: node.attr("fixed").or(declaration.attr("fixed")).map(str::to_owned),
                });
            }
            other => {
                return Err(ValidationError::xsd_compile(format!(
                    "unexpected <{other}> among attributes"
                )))
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Particles
    // -----------------------------------------------------------------------

    fn particle(&mut self, node: &'n Node, depth: usize) -> Result<Term> {
        self.guard(depth, &node.local())?;
        let (min, max) = occurs(node)?;

        let term = match node.local() {
            "element" => Term::Element(self.element_particle(node, depth)?),
            "sequence" => Term::seq(self.particles(node, depth)?),
            "choice" => Term::Choice(self.particles(node, depth)?),
            "all" => Term::All(self.particles(node, depth)?),
            "any" => Term::Wildcard(self.wildcard(node)?),
            "group" => {
                let name = node
                    .qname_attr("ref")?
                    .ok_or_else(|| ValidationError::xsd_compile("local <group> needs 'ref'"))?;
                let group = *self.groups.get(&name).ok_or_else(|| {
                    ValidationError::xsd_compile(format!("group '{name}' is not declared"))
                })?;
                let model = group.components().next().ok_or_else(|| {
                    ValidationError::xsd_compile(format!("group '{name}' is empty"))
                })?;
                self.particle(model, depth + 1)?
            }
            other => {
                return Err(ValidationError::xsd_compile(format!(
                    "unsupported <{other}> in content model"
                )))
            }
        };
        Ok(Term::repeat(term, min, max))
    }

    fn particles(&mut self, node: &'n Node, depth: usize) -> Result<Vec<Term>> {
        node.components()
            .map(|child| self.particle(child, depth + 1))
            .collect()
    }

    fn wildcard(&self, node: &Node) -> Result<Wildcard> {
        let namespaces = match node.attr("namespace").map(str::trim) {
            None | Some("##any") => NamespaceConstraint::Any,
            Some("##other") => NamespaceConstraint::Other(self.target_namespace.clone()),
            Some(list) => NamespaceConstraint::Enumerated(
                list.split_whitespace()
                    .map(|token| match token {
                        "##targetNamespace" => self.target_namespace.clone(),
                        "##local" => None,
                        uri => Some(uri.to_owned()),
                    })
                    .collect(),
            ),
        };
        let process = match node.attr("processContents") {
            None | Some("strict") => ProcessContents::Strict,
            Some("lax") => ProcessContents::Lax,
            Some("skip") => ProcessContents::Skip,
            Some(other) => {
                return Err(ValidationError::xsd_compile(format!(
                    "unknown processContents '{other}'"
                )))
            }
        };
        Ok(Wildcard {
            namespaces,
            process,
        })
    }

    // -----------------------------------------------------------------------
    // Elements
    // -----------------------------------------------------------------------

    fn element_particle(&mut self, node: &'n Node, depth: usize) -> Result<ElementParticle> {
        if let Some(name) = node.qname_attr("ref")? {
            if !self.elements.contains_key(&name) {
                return Err(ValidationError::xsd_compile(format!(
                    "element '{name}' is not declared"
                )));
            }
            return Ok(ElementParticle::Global(name));
        }

        let qualified = match node.attr("form") {
            Some(form) => form == "qualified",
            None => self.elements_qualified,
        };
        let namespace = if qualified {
            self.target_namespace.as_deref()
        } else {
            None
        };
        let name = QName::new(namespace, node.required_attr("name")?);
        Ok(ElementParticle::Local(Arc::new(
            self.element_decl(node, name, depth)?,
        )))
    }

    fn element_decl(&mut self, node: &'n Node, name: QName, depth: usize) -> Result<ElementDecl> {
        if node.attr("substitutionGroup").is_some() {
            return Err(ValidationError::xsd_compile(format!(
                "substitution groups are not supported (element '{name}')"
            )));
        }

        let mut inline = None;
        for child in node.components() {
            match child.local() {
                "complexType" | "simpleType" => inline = Some(self.type_def(child, depth + 1)?),
                other => {
                    return Err(ValidationError::xsd_compile(format!(
                        "unsupported <{other}> in element '{name}'"
                    )))
                }
            }
        }

        let type_ref = match (node.qname_attr("type")?, inline) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::xsd_compile(format!(
                    "element '{name}' has both a type attribute and an inline type"
                )))
            }
            (Some(type_name), None) => {
                self.type_exists(&type_name)?;
                TypeRef::Named(type_name)
            }
            (None, Some(def)) => TypeRef::Anonymous(def),
            (None, None) => TypeRef::Named(QName::xsd("anyType")),
        };

        Ok(ElementDecl {
            name,
            type_ref,
            nillable: bool_attr(node, "nillable"),
            default: node.attr("default").map(str::to_owned),
            fixed: node.attr("fixed").map(str::to_owned),
        })
    }
}

/// Name of the type a named definition is derived from. Lists, unions and
/// restrictions of an anonymous base count as derived from `anySimpleType`.
fn declared_base(node: &Node) -> Result<QName> {
    let (derivation, fallback) = match node.local() {
        "simpleType" => (node.components().next(), "anySimpleType"),
        _ => (
            node.components()
                .find(|child| matches!(child.local(), "simpleContent" | "complexContent"))
                .and_then(|content| {
                    content
                        .components()
                        .find(|child| matches!(child.local(), "extension" | "restriction"))
                }),
            "anyType",
        ),
    };
    let base = match derivation.filter(|d| matches!(d.local(), "extension" | "restriction")) {
        Some(derivation) => derivation.qname_attr("base")?,
        None => None,
    };
    Ok(base.unwrap_or_else(|| QName::xsd(fallback)))
}

fn bool_attr(node: &Node, local: &str) -> bool {
    matches!(node.attr(local).map(str::trim), Some("true" | "1"))
}

fn occurs(node: &Node) -> Result<(u32, Option<u32>)> {
    let parse = |raw: &str| {
        raw.trim().parse::<u32>().map_err(|_| {
            ValidationError::xsd_compile(format!("invalid occurrence '{raw}' on <{}>", node.local()))
        })
    };
    let min = node.attr("minOccurs").map(parse).transpose()?.unwrap_or(1);
    let max = match node.attr("maxOccurs").map(str::trim) {
        Some("unbounded") => None,
        Some(raw) => Some(parse(raw)?),
        None => Some(1),
    };
    if max.is_some_and(|max| min > max) {
        return Err(ValidationError::xsd_compile(format!(
            "minOccurs {min} exceeds maxOccurs on <{}>",
            node.local()
        )));
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn compile(body: &str) -> Result<SchemaSet> {
        compile_schema(&format!("<xs:schema {XS}>{body}</xs:schema>"), 16)
    }

    #[test]
    fn test_compiles_global_elements_and_types() {
        let set = compile(
            r#"<xs:element name="root" type="RootType"/>
               <xs:complexType name="RootType">
                 <xs:sequence><xs:element name="x" type="xs:int"/></xs:sequence>
               </xs:complexType>"#,
        )
        .unwrap();
        assert_eq!(set.global_elements(), vec![&QName::new(None, "root")]);
        assert!(matches!(
            set.resolve(&TypeRef::Named(QName::new(None, "RootType"))),
            Some(TypeDef::Complex(_))
        ));
    }

    #[test]
    fn test_target_namespace_qualifies_globals() {
        let set = compile_schema(
            &format!(r#"<xs:schema {XS} targetNamespace="urn:t"><xs:element name="a"/></xs:schema>"#),
            16,
        )
        .unwrap();
        assert_eq!(set.target_namespace(), Some("urn:t"));
        assert_eq!(set.global_elements(), vec![&QName::new(Some("urn:t"), "a")]);
    }

    #[test]
    fn test_recursive_element_type_compiles() {
        let set = compile(
            r#"<xs:element name="node" type="Node"/>
               <xs:complexType name="Node">
                 <xs:sequence>
                   <xs:element name="node" type="Node" minOccurs="0" maxOccurs="unbounded"/>
                 </xs:sequence>
               </xs:complexType>"#,
        );
        assert!(set.is_ok(), "{:?}", set.err());
    }

    #[test]
    fn test_undeclared_type_is_a_compile_error() {
        let err = compile(r#"<xs:element name="a" type="Missing"/>"#).unwrap_err();
        assert!(matches!(err, ValidationError::XsdCompile(_)), "{err}");
    }

    #[test]
    fn test_circular_simple_derivation_hits_depth_guard() {
        let err = compile(
            r#"<xs:simpleType name="A"><xs:restriction base="B"/></xs:simpleType>
               <xs:simpleType name="B"><xs:restriction base="A"/></xs:simpleType>"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::DepthExceeded { .. }), "{err}");
    }

    #[test]
    fn test_non_schema_root_rejected() {
        assert!(matches!(
            compile_schema("<root/>", 16),
            Err(ValidationError::XsdCompile(_))
        ));
        assert!(matches!(
            compile_schema(r#"{"type":"object"}"#, 16),
            Err(ValidationError::XsdParse(_))
        ));
    }

    #[test]
    fn test_unsupported_constructs_rejected() {
        assert!(compile(r#"<xs:import namespace="urn:x"/>"#).is_err());
        assert!(compile(
            r#"<xs:element name="a"><xs:key name="k"><xs:selector xpath="."/><xs:field xpath="@id"/></xs:key></xs:element>"#
        )
        .is_err());
    }

    #[test]
    fn test_occurs_validation() {
        assert!(compile(
            r#"<xs:element name="a"><xs:complexType><xs:sequence>
                 <xs:element name="b" minOccurs="3" maxOccurs="2"/>
               </xs:sequence></xs:complexType></xs:element>"#
        )
        .is_err());
    }

    #[test]
    fn test_annotations_ignored() {
        assert!(compile(
            r#"<xs:annotation><xs:documentation>docs</xs:documentation></xs:annotation>
               <xs:element name="a" type="xs:string">
                 <xs:annotation><xs:documentation>more</xs:documentation></xs:annotation>
               </xs:element>"#
        )
        .is_ok());
    }

    #[test]
    fn test_records_base_of_each_named_type() {
        let set = compile(
            r#"<xs:simpleType name="Small"><xs:restriction base="xs:short"/></xs:simpleType>
               <xs:simpleType name="Ints"><xs:list itemType="xs:int"/></xs:simpleType>
               <xs:complexType name="Base"><xs:sequence/></xs:complexType>
               <xs:complexType name="Derived"><xs:complexContent>
                 <xs:extension base="Base"/>
               </xs:complexContent></xs:complexType>"#,
        )
        .unwrap();
        let name = |local: &str| QName::new(None, local);
        assert_eq!(set.bases.get(&name("Small")), Some(&QName::xsd("short")));
        assert_eq!(set.bases.get(&name("Ints")), Some(&QName::xsd("anySimpleType")));
        assert_eq!(set.bases.get(&name("Base")), Some(&QName::xsd("anyType")));
        assert!(set.derives_from(&name("Derived"), &name("Base")));
        assert!(set.derives_from(&name("Small"), &QName::xsd("integer")));
        assert!(!set.derives_from(&name("Base"), &name("Derived")));
    }
}
