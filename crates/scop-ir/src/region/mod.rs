//! Region model.
//!
//! A [`Scop`] is one lifted polyhedral region: its arrays, parameters,
//! computations, statements and polyhedral relations. It is built once from
//! an [`ExtractionRecord`], rewritten in place by propagation, then only read.

mod build;
mod display;
pub mod record;

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    entity::ValueId,
    parser::PolyExpr,
    types::Type,
    value::{AccessKind, ValueKind, Values},
};
pub use record::ExtractionRecord;

/// Storage class of a memory reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemRefKind {
    /// Array in memory
    Array,
    /// Scalar carried between statements
    Value,
    /// Scalar backing a `phi`
    Phi,
    /// Scalar backing a `phi` at the region exit
    ExitPhi,
}

impl fmt::Display for MemRefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemRefKind::Array => "array",
            MemRefKind::Value => "value",
            MemRefKind::Phi => "phi",
            MemRefKind::ExitPhi => "exit_phi",
        };
        f.write_str(name)
    }
}

/// Extent of one array dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extent {
    /// `*`: unknown outermost extent
    Unranked,
    Fixed(u64),
    /// Expression over parameters
    Symbolic(String),
}

impl Extent {
    pub fn parse(text: &str) -> Extent {
        let text = text.trim();
        if text == "*" {
            Extent::Unranked
        } else if let Ok(n) = text.parse() {
            Extent::Fixed(n)
        } else {
            Extent::Symbolic(text.to_string())
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Unranked => write!(f, "*"),
            Extent::Fixed(n) => write!(f, "{}", n),
            Extent::Symbolic(expr) => write!(f, "{}", expr),
        }
    }
}

/// Array or scalar storage referenced by accesses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemRef {
    pub name: String,
    pub kind: MemRefKind,
    pub shape: Vec<Extent>,
    /// Element type spelling
    pub element: String,
    /// Printed base pointer
    pub variable: String,
}

impl MemRef {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn element_type(&self) -> Option<Type> {
        Type::parse(&self.element)
    }
}

/// Symbolic scalar of the region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// isl name
    pub name: String,
    /// SSA reference
    pub reference: String,
    pub ty: Type,
    pub value: ValueId,
}

/// One memory access of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub value: ValueId,
    pub relation: PolyExpr,
}

/// One statement of the region
#[derive(Debug, Clone)]
pub struct Statement {
    pub name: String,
    pub domain: PolyExpr,
    pub affine: bool,
    /// Number of loops surrounding the statement
    pub depth: usize,
    /// Accesses keyed by defined reference (reads) or instruction text (writes)
    pub accesses: IndexMap<String, Access>,
    /// Induction variables keyed by reference
    pub loops: IndexMap<String, ValueId>,
}

impl Statement {
    /// Write accesses in declaration order
    pub fn writes<'a>(&'a self, values: &'a Values) -> impl Iterator<Item = (&'a str, &'a Access)> {
        self.accesses
            .iter()
            .filter(move |(_, access)| !values[access.value].is_read())
            .map(|(key, access)| (key.as_str(), access))
    }

    /// Read accesses in declaration order
    pub fn reads<'a>(&'a self, values: &'a Values) -> impl Iterator<Item = (&'a str, &'a Access)> {
        self.accesses
            .iter()
            .filter(move |(_, access)| values[access.value].is_read())
            .map(|(key, access)| (key.as_str(), access))
    }
}

/// The five dependence relations
#[derive(Debug, Clone)]
pub struct Dependences {
    pub raw: PolyExpr,
    pub war: PolyExpr,
    pub waw: PolyExpr,
    pub red: PolyExpr,
    pub tc_red: PolyExpr,
}

impl Dependences {
    /// Relations with their record names
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PolyExpr)> {
        [
            ("RAW", &self.raw),
            ("WAR", &self.war),
            ("WAW", &self.waw),
            ("RED", &self.red),
            ("TC_RED", &self.tc_red),
        ]
        .into_iter()
    }

    fn without(&self, names: &[String]) -> Dependences {
        Dependences {
            raw: self.raw.without(names),
            war: self.war.without(names),
            waw: self.waw.without(names),
            red: self.red.without(names),
            tc_red: self.tc_red.without(names),
        }
    }
}

/// A statement excluded because it depends on an unrepresentable merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedStatement {
    pub name: String,
    /// Reference of the merge it reaches
    pub merge: String,
}

/// Access range of one alias group member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRange {
    pub minimal: String,
    pub maximal: String,
    pub readonly: bool,
}

/// A lifted polyhedral region
#[derive(Debug, Clone)]
pub struct Scop {
    pub name: String,
    pub values: Values,
    pub memrefs: IndexMap<String, MemRef>,
    /// Parameters keyed by SSA reference
    pub parameters: IndexMap<String, Parameter>,
    /// Region-wide computations and resolved merges keyed by reference
    pub computations: IndexMap<String, ValueId>,
    pub statements: IndexMap<String, Statement>,
    pub schedule: PolyExpr,
    pub dependences: Dependences,
    pub context: PolyExpr,
    pub dropped: Vec<DroppedStatement>,
    pub access_ranges: Vec<Vec<AccessRange>>,
}

impl Scop {
    /// Look up a `read` access by key in any statement, in declaration order
    pub fn find_read(&self, reference: &str) -> Option<ValueId> {
        self.statements.values().find_map(|stmt| {
            stmt.accesses
                .get(reference)
                .map(|access| access.value)
                .filter(|&id| self.values[id].is_read())
        })
    }

    /// Look up an induction variable by reference in any statement
    pub fn find_induction_variable(&self, reference: &str) -> Option<ValueId> {
        self.statements
            .values()
            .find_map(|stmt| stmt.loops.get(reference).copied())
    }

    /// Values whose arguments propagation rewrites: computations in
    /// declaration order, then accesses statement by statement
    pub fn argument_owners(&self) -> Vec<ValueId> {
        self.computations
            .values()
            .copied()
            .chain(
                self.statements
                    .values()
                    .flat_map(|stmt| stmt.accesses.values().map(|access| access.value)),
            )
            .collect()
    }

    /// Whether any statement is surrounded by a loop
    pub fn has_loops(&self) -> bool {
        self.statements
            .values()
            .any(|stmt| stmt.depth > 0 || stmt.domain.pieces.iter().any(|p| !p.input.dims.is_empty()))
    }

    /// Array an access value targets, if it is an access
    pub fn access_array(&self, id: ValueId) -> Option<(&str, AccessKind)> {
        match &self.values[id].kind {
            ValueKind::MemoryAccess { kind, array, .. } => Some((array.as_str(), *kind)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_parse() {
        assert_eq!(Extent::parse("*"), Extent::Unranked);
        assert_eq!(Extent::parse(" 256 "), Extent::Fixed(256));
        assert_eq!(Extent::parse("n"), Extent::Symbolic("n".to_string()));
        assert_eq!(Extent::parse("1 + n").to_string(), "1 + n");
    }

    #[test]
    fn test_memref_kind_display() {
        assert_eq!(MemRefKind::ExitPhi.to_string(), "exit_phi");
        assert_eq!(MemRefKind::Array.to_string(), "array");
    }
}
