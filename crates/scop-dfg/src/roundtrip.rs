//! Round-trip check.
//!
//! Every write access of the region must have a write node in its
//! statement's scope that stores to the same array element and computes
//! exactly the value the region assigns. A mismatch means the generator
//! lost or reordered something.
//!
//! Values and nodes are compared pairwise, each (value, node) pair once, so
//! shared operands cost nothing extra.

use std::collections::HashSet;

use scop_ir::{AccessKind, LiftError, Result, Scop, Statement, ValueId, ValueKind};
use tracing::debug;

use crate::{
    generator::{access_of, subscript},
    graph::{DataflowGraph, NodeId, NodeKind},
};

fn defect(message: String) -> LiftError {
    LiftError::GenerationDefect(message)
}

/// Pairwise matcher for one statement
struct Matcher<'a> {
    scop: &'a Scop,
    graph: &'a DataflowGraph,
    stmt: &'a Statement,
    /// Domain dimension names, in loop order
    dims: &'a [String],
    matched: HashSet<(ValueId, NodeId)>,
}

impl Matcher<'_> {
    fn dim_of(&self, reference: &str) -> Option<&str> {
        let depth = self.stmt.loops.get_index_of(reference)?;
        self.dims.get(depth).map(String::as_str)
    }

    fn read_subscript(&self, id: ValueId) -> Option<Vec<String>> {
        access_of(self.scop, id).map(|access| subscript(&access.relation))
    }

    /// Check that `node` computes `value`; the error is the first
    /// mismatching pair
    fn check(&mut self, value: ValueId, node: NodeId) -> std::result::Result<(), (ValueId, NodeId)> {
        if self.matched.contains(&(value, node)) {
            return Ok(());
        }
        let (scop, graph) = (self.scop, self.graph);
        let data = &scop.values[value];
        let args = scop.values.args(value);
        let Some(actual) = graph.node(node) else {
            return Err((value, node));
        };

        if let ValueKind::Merge { select: false, .. } = data.kind {
            // Forwarded in place: the node computes the forwarded value
            let [forwarded] = args else {
                return Err((value, node));
            };
            self.check(*forwarded, node)?;
            self.matched.insert((value, node));
            return Ok(());
        }

        if actual.ty != data.ty {
            return Err((value, node));
        }
        let inputs: &[ValueId] = match (&data.kind, &actual.kind) {
            (ValueKind::Constant { literal }, NodeKind::Constant { literal: emitted })
                if literal == emitted =>
            {
                &[]
            }
            (ValueKind::Parameter { .. }, NodeKind::Symbol { reference, .. })
                if *reference == data.reference =>
            {
                &[]
            }
            (ValueKind::InductionVariable { .. }, NodeKind::Index { dim, reference })
                if *reference == data.reference
                    && self.dim_of(reference) == Some(dim.as_str()) =>
            {
                &[]
            }
            (
                ValueKind::MemoryAccess {
                    kind: AccessKind::Read,
                    array,
                    ..
                },
                NodeKind::Read {
                    array: emitted,
                    subscript: emitted_subscript,
                    reference,
                },
            ) if array == emitted
                && *reference == data.reference
                && self.read_subscript(value).as_ref() == Some(emitted_subscript) =>
            {
                &[]
            }
            (ValueKind::Computation { opcode, .. }, NodeKind::Compute { opcode: emitted })
                if opcode == emitted =>
            {
                args
            }
            (ValueKind::Merge { select: true, .. }, NodeKind::Select) => args,
            _ => return Err((value, node)),
        };

        if inputs.len() != actual.inputs.len() {
            return Err((value, node));
        }
        for (&arg, &input) in inputs.iter().zip(&actual.inputs) {
            self.check(arg, input)?;
        }
        self.matched.insert((value, node));
        Ok(())
    }
}

/// Check every write access of the region against the graph
pub fn check_roundtrip(scop: &Scop, graph: &DataflowGraph) -> Result<()> {
    let mut checked = 0;
    for stmt in scop.statements.values() {
        let scope = graph
            .scopes
            .iter()
            .find(|scope| scope.statement == stmt.name)
            .ok_or_else(|| defect(format!("Statement {} has no iteration scope", stmt.name)))?;
        let dims = stmt
            .domain
            .piece(&stmt.name)
            .map(|piece| piece.input.dims.as_slice())
            .unwrap_or_default();
        let mut matcher = Matcher {
            scop,
            graph,
            stmt,
            dims,
            matched: HashSet::new(),
        };

        for (key, access) in stmt.writes(&scop.values) {
            let Some((write, node)) = scope.nodes.iter().find_map(|&id| {
                let node = graph.node(id)?;
                (node.origin == access.value && matches!(node.kind, NodeKind::Write { .. }))
                    .then_some((id, node))
            }) else {
                return Err(defect(format!(
                    "Write {} of {} has no write node",
                    key, stmt.name
                )));
            };
            let NodeKind::Write {
                array,
                subscript: emitted,
            } = &node.kind
            else {
                return Err(defect(format!("Write {} of {} is not a write node", key, stmt.name)));
            };

            let expected = scop.access_array(access.value).map(|(array, _)| array);
            let expected_subscript = subscript(&access.relation);
            if expected != Some(array.as_str()) || *emitted != expected_subscript {
                return Err(defect(format!(
                    "Write {} of {} stores to {}[{}] but the region stores to {}[{}]",
                    key,
                    stmt.name,
                    array,
                    emitted.join(", "),
                    expected.unwrap_or("?"),
                    expected_subscript.join(", ")
                )));
            }

            let ([stored], [input]) = (scop.values.args(access.value), node.inputs.as_slice())
            else {
                return Err(defect(format!(
                    "Write {} of {} has a malformed node {}",
                    key, stmt.name, write
                )));
            };
            matcher.check(*stored, *input).map_err(|(value, node)| {
                let emitted = graph
                    .node(node)
                    .map(|n| n.kind.to_string())
                    .unwrap_or_else(|| "missing".to_string());
                let data = &scop.values[value];
                defect(format!(
                    "Write {} of {}: node {} ({}) does not compute {} ({})",
                    key,
                    stmt.name,
                    node,
                    emitted,
                    data.reference,
                    data.kind_name()
                ))
            })?;
            checked += 1;
        }
    }

    let emitted = graph.writes().count();
    if emitted != checked {
        return Err(defect(format!(
            "Graph has {} write nodes but the region has {} writes",
            emitted, checked
        )));
    }
    debug!(writes = checked, "round trip matched");
    Ok(())
}
