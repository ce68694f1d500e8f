//! XML Schema (XSD 1.0 subset) compilation and streaming validation.
//!
//! Covers global and local element declarations, named and anonymous
//! complex/simple types, `sequence`/`choice`/`all`/`any` content models with
//! occurrence bounds, named model and attribute groups, attribute uses and
//! wildcards, simple and complex content derivation, `restriction`/`list`/
//! `union` simple types with the usual facets, and `xsi:type`/`xsi:nil`.
//! Imports, includes, substitution groups and identity constraints are
//! rejected at compile time.

mod compile;
mod model;
mod particle;
mod reader;
mod scan;
mod simple;

pub use compile::compile_schema;
pub use model::{QName, SchemaSet};
pub use reader::ValidatingReader;
