//! Content models as terms, matched one child element at a time.
//!
//! Each child start tag replaces the parent's term with its derivative with
//! respect to that child's name. The parent's content is complete when the
//! remaining term is nullable.

use std::sync::Arc;

use super::model::{ElementDecl, QName, Wildcard};

#[derive(Debug, Clone)]
pub(crate) enum ElementParticle {
    Local(Arc<ElementDecl>),
    /// `ref` to a global element, resolved at match time.
    Global(QName),
}

impl ElementParticle {
    fn name(&self) -> &QName {
        match self {
            ElementParticle::Local(decl) => &decl.name,
            ElementParticle::Global(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Term {
    Empty,
    Element(ElementParticle),
    Wildcard(Wildcard),
    Seq(Vec<Term>),
    Choice(Vec<Term>),
    /// Each member at most once, in any order.
    All(Vec<Term>),
    Repeat {
        term: Box<Term>,
        min: u32,
        max: Option<u32>,
    },
}

/// What a child element matched in its parent's content model.
#[derive(Debug, Clone)]
pub(crate) enum Matched {
    Element(ElementParticle),
    Wildcard(Wildcard),
}

impl Term {
    pub(crate) fn seq(items: Vec<Term>) -> Term {
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Term::Empty => {}
                Term::Seq(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Term::Empty,
            1 => flat.pop().unwrap_or(Term::Empty),
            _ => Term::Seq(flat),
        }
    }

    pub(crate) fn repeat(term: Term, min: u32, max: Option<u32>) -> Term {
        match (min, max) {
            (1, Some(1)) => term,
            (_, Some(0)) => Term::Empty,
            _ => Term::Repeat {
                term: Box::new(term),
                min,
                max,
            },
        }
    }

    pub(crate) fn nullable(&self) -> bool {
        match self {
            Term::Empty => true,
            Term::Element(_) | Term::Wildcard(_) => false,
            Term::Seq(items) | Term::All(items) => items.iter().all(Term::nullable),
            Term::Choice(items) => items.iter().any(Term::nullable),
            Term::Repeat { term, min, .. } => *min == 0 || term.nullable(),
        }
    }

    /// The term left after consuming an element named `name`, or `None`
    /// if the element is not allowed here.
    pub(crate) fn derive(&self, name: &QName) -> Option<(Term, Matched)> {
        match self {
            Term::Empty => None,
            Term::Element(particle) => (particle.name() == name)
                .then(|| (Term::Empty, Matched::Element(particle.clone()))),
            Term::Wildcard(wildcard) => wildcard
                .allows(name.namespace.as_deref())
                .then(|| (Term::Empty, Matched::Wildcard(wildcard.clone()))),
            Term::Seq(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Some((rest, matched)) = item.derive(name) {
                        let mut next = Vec::with_capacity(items.len() - i);
                        next.push(rest);
                        next.extend(items[i + 1..].iter().cloned());
                        return Some((Term::seq(next), matched));
                    }
                    if !item.nullable() {
                        break;
                    }
                }
                None
            }
            Term::Choice(items) => items.iter().find_map(|item| item.derive(name)),
            Term::All(items) => items.iter().enumerate().find_map(|(i, item)| {
                item.derive(name).map(|(rest, matched)| {
                    let remaining: Vec<Term> = items
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != i)
                        .map(|(_, other)| other.clone())
                        .collect();
                    let remaining = if remaining.is_empty() {
                        Term::Empty
                    } else {
                        Term::All(remaining)
                    };
                    (Term::seq(vec![rest, remaining]), matched)
                })
            }),
            Term::Repeat { term, min, max } => {
                if *max == Some(0) {
                    return None;
                }
                let (rest, matched) = term.derive(name)?;
                let again = Term::repeat(
                    (**term).clone(),
                    min.saturating_sub(1),
                    max.map(|m| m - 1),
                );
                Some((Term::seq(vec![rest, again]), matched))
            }
        }
    }

    /// Names that could start the remaining content, for error messages.
    pub(crate) fn expected(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_expected(&mut names);
        names.dedup();
        names
    }

    fn collect_expected(&self, out: &mut Vec<String>) {
        match self {
            Term::Empty => {}
            Term::Element(particle) => out.push(particle.name().to_string()),
            Term::Wildcard(_) => out.push("*".into()),
            Term::Seq(items) => {
                for item in items {
                    item.collect_expected(out);
                    if !item.nullable() {
                        break;
                    }
                }
            }
            Term::Choice(items) | Term::All(items) => {
                items.iter().for_each(|item| item.collect_expected(out))
            }
            Term::Repeat { term, max, .. } => {
                if *max != Some(0) {
                    term.collect_expected(out);
                }
            }
        }
    }
}
