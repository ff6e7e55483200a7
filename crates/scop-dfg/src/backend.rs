//! Graph backends.
//!
//! A backend turns a verified [`DataflowGraph`] into whatever artifact the
//! caller builds from it. The lifter only hands over the graph and the
//! region metadata below.

use indexmap::IndexMap;
use scop_ir::{AccessRange, MemRefKind, Scop, Type};

use crate::graph::DataflowGraph;

/// Region facts a backend needs beyond the graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMetadata {
    pub name: String,
    /// Parameters by isl name
    pub parameters: IndexMap<String, Type>,
    /// Parameters the context pins to one value (`n = 256`)
    pub constants: IndexMap<String, i64>,
    /// Extents of each materialized array, outermost first
    pub size_hints: IndexMap<String, Vec<String>>,
    /// Access ranges of every alias group member
    pub access_ranges: Vec<AccessRange>,
}

impl RegionMetadata {
    pub fn from_scop(scop: &Scop) -> Self {
        let parameters = scop
            .parameters
            .values()
            .map(|param| (param.name.clone(), param.ty))
            .collect();

        let mut constants = IndexMap::new();
        for piece in &scop.context.pieces {
            let Some(constraints) = &piece.constraints else {
                continue;
            };
            for conjunct in constraints.split(" and ") {
                if let Some((name, value)) = pinned(conjunct, &scop.context.params) {
                    constants.insert(name.to_string(), value);
                }
            }
        }

        let size_hints = scop
            .memrefs
            .values()
            .filter(|memref| memref.kind == MemRefKind::Array)
            .map(|memref| {
                let extents = memref.shape.iter().map(|e| e.to_string()).collect();
                (memref.name.clone(), extents)
            })
            .collect();

        Self {
            name: scop.name.clone(),
            parameters,
            constants,
            size_hints,
            access_ranges: scop.access_ranges.iter().flatten().cloned().collect(),
        }
    }
}

/// `p = 42` or `42 = p` for a parameter `p`
fn pinned<'a>(conjunct: &'a str, params: &[String]) -> Option<(&'a str, i64)> {
    if conjunct.contains(['<', '>', '!']) {
        return None;
    }
    let (lhs, rhs) = conjunct.split_once('=')?;
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    let is_param = |name: &str| params.iter().any(|p| p == name);
    match (lhs.parse(), rhs.parse()) {
        (Err(_), Ok(value)) if is_param(lhs) => Some((lhs, value)),
        (Ok(value), Err(_)) if is_param(rhs) => Some((rhs, value)),
        _ => None,
    }
}

/// Consumer of generated graphs
pub trait Backend {
    type Artifact;
    type Error: std::error::Error;

    /// Build the artifact for one region
    fn materialize(
        &mut self,
        graph: &DataflowGraph,
        metadata: &RegionMetadata,
    ) -> Result<Self::Artifact, Self::Error>;
}
