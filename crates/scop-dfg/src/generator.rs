//! Dataflow graph generation.
//!
//! Walks a verified region statement by statement, in schedule order. Each
//! statement becomes one iteration scope holding a node for every value its
//! writes reach.

use std::collections::{HashMap, HashSet};

use scop_ir::{
    parser::PolyExpr, Access, AccessKind, LiftError, MemRefKind, Result, Scop, Statement,
    ValueId, ValueKind,
};
use tracing::{debug, trace};

use crate::{
    graph::{ArrayDecl, DataflowGraph, IterationScope, Node, NodeId, NodeKind, Range},
    schedule::statement_order,
};

fn defect(message: String) -> LiftError {
    LiftError::GenerationDefect(message)
}

/// Subscript expressions of an access relation
pub(crate) fn subscript(relation: &PolyExpr) -> Vec<String> {
    relation
        .pieces
        .first()
        .and_then(|piece| piece.output.as_ref())
        .map(|tuple| tuple.dims.clone())
        .unwrap_or_default()
}

/// The access a value belongs to, in any statement
pub(crate) fn access_of(scop: &Scop, id: ValueId) -> Option<&Access> {
    scop.statements
        .values()
        .flat_map(|stmt| stmt.accesses.values())
        .find(|access| access.value == id)
}

/// Iteration ranges and residual conditions of a statement's domain
fn scope_bounds(stmt: &Statement) -> Result<(Vec<Range>, Vec<String>, Vec<String>)> {
    let pieces: Vec<_> = stmt
        .domain
        .pieces
        .iter()
        .filter(|piece| piece.input.name.as_deref() == Some(stmt.name.as_str()))
        .collect();
    let piece = match pieces.as_slice() {
        [piece] => *piece,
        [] => return Err(defect(format!("Statement {} has an empty domain", stmt.name))),
        _ => {
            return Err(defect(format!(
                "Domain of {} is a union of {} pieces",
                stmt.name,
                pieces.len()
            )))
        }
    };

    let bounds = piece.bounds();
    let mut ranges = Vec::with_capacity(bounds.dims.len());
    for dim in bounds.dims {
        let (Some(lower), Some(upper)) = (dim.lower, dim.upper) else {
            return Err(defect(format!(
                "Dimension {} of {} has no derivable lower and upper bound",
                dim.name, stmt.name
            )));
        };
        ranges.push(Range {
            dim: dim.name,
            lower,
            upper,
        });
    }
    Ok((ranges, bounds.conditions, piece.input.dims.clone()))
}

struct Emitter<'a> {
    scop: &'a Scop,
    stmt: &'a Statement,
    /// Domain dimension names, in loop order
    dims: Vec<String>,
    graph: &'a mut DataflowGraph,
    memo: HashMap<ValueId, NodeId>,
    visiting: HashSet<ValueId>,
    nodes: Vec<NodeId>,
}

impl Emitter<'_> {
    fn add(&mut self, origin: ValueId, kind: NodeKind, inputs: Vec<NodeId>) -> NodeId {
        let ty = self.scop.values[origin].ty;
        let id = self.graph.add_node(Node {
            kind,
            ty,
            inputs,
            origin,
        });
        self.nodes.push(id);
        self.memo.insert(origin, id);
        id
    }

    fn read(&mut self, id: ValueId, relation: &PolyExpr) -> Result<NodeId> {
        let scop = self.scop;
        let Some((array, _)) = scop.access_array(id) else {
            return Err(defect(format!("Value {} is not an access", id)));
        };
        let kind = NodeKind::Read {
            array: array.to_string(),
            subscript: subscript(relation),
            reference: scop.values[id].reference.clone(),
        };
        Ok(self.add(id, kind, Vec::new()))
    }

    fn emit(&mut self, id: ValueId) -> Result<NodeId> {
        let scop = self.scop;
        if let Some(&node) = self.memo.get(&id) {
            return Ok(node);
        }
        if !self.visiting.insert(id) {
            return Err(defect(format!(
                "Value {} depends on itself",
                scop.values[id].reference
            )));
        }
        let value = &scop.values[id];
        let args = scop.values.args(id);

        let node = match &value.kind {
            ValueKind::Constant { literal } => self.add(
                id,
                NodeKind::Constant {
                    literal: literal.clone(),
                },
                Vec::new(),
            ),
            ValueKind::Parameter { name } => self.add(
                id,
                NodeKind::Symbol {
                    name: name.clone(),
                    reference: value.reference.clone(),
                },
                Vec::new(),
            ),
            ValueKind::InductionVariable { .. } => {
                let stmt = self.stmt;
                let dim = stmt
                    .loops
                    .get_index_of(&value.reference)
                    .and_then(|depth| self.dims.get(depth))
                    .cloned()
                    .ok_or_else(|| {
                        defect(format!(
                            "Induction variable {} binds no dimension of {}",
                            value.reference, stmt.name
                        ))
                    })?;
                self.add(
                    id,
                    NodeKind::Index {
                        dim,
                        reference: value.reference.clone(),
                    },
                    Vec::new(),
                )
            }
            ValueKind::MemoryAccess {
                kind: AccessKind::Read,
                ..
            } => {
                // Read owned by another statement
                let relation = access_of(scop, id)
                    .map(|access| access.relation.clone())
                    .ok_or_else(|| defect(format!("Read {} has no access", value.reference)))?;
                self.read(id, &relation)?
            }
            ValueKind::Computation { opcode, .. } => {
                let inputs = args
                    .iter()
                    .map(|&arg| self.emit(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.add(
                    id,
                    NodeKind::Compute {
                        opcode: opcode.clone(),
                    },
                    inputs,
                )
            }
            ValueKind::Merge { select: true, .. } => {
                if args.len() != 3 {
                    return Err(defect(format!(
                        "Selection {} has {} operands",
                        value.reference,
                        args.len()
                    )));
                }
                let inputs = args
                    .iter()
                    .map(|&arg| self.emit(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.add(id, NodeKind::Select, inputs)
            }
            ValueKind::Merge { select: false, .. } => {
                let [forwarded] = args else {
                    return Err(defect(format!(
                        "Merge {} forwards {} values",
                        value.reference,
                        args.len()
                    )));
                };
                let node = self.emit(*forwarded)?;
                self.memo.insert(id, node);
                node
            }
            ValueKind::MemoryAccess {
                kind: AccessKind::Write,
                ..
            }
            | ValueKind::Unresolved => {
                return Err(defect(format!(
                    "Value {} ({}) cannot be an operand",
                    value.reference,
                    value.kind_name()
                )))
            }
        };
        self.visiting.remove(&id);
        Ok(node)
    }

    fn statement(&mut self) -> Result<()> {
        let (scop, stmt) = (self.scop, self.stmt);
        for (_, access) in stmt.reads(&scop.values) {
            self.read(access.value, &access.relation)?;
        }
        for (key, access) in stmt.writes(&scop.values) {
            let [stored] = scop.values.args(access.value) else {
                return Err(defect(format!(
                    "Write {} of {} has no stored value",
                    key, stmt.name
                )));
            };
            let input = self.emit(*stored)?;
            let Some((array, _)) = scop.access_array(access.value) else {
                return Err(defect(format!("Write {} is not an access", key)));
            };
            let kind = NodeKind::Write {
                array: array.to_string(),
                subscript: subscript(&access.relation),
            };
            self.add(access.value, kind, vec![input]);
        }
        Ok(())
    }
}

/// Generate the dataflow graph of a propagated, verified region
pub fn generate(scop: &Scop) -> Result<DataflowGraph> {
    let mut graph = DataflowGraph::new(scop.name.clone());
    for memref in scop.memrefs.values() {
        if memref.kind == MemRefKind::Array {
            graph.declare_array(ArrayDecl {
                name: memref.name.clone(),
                element: memref.element.clone(),
                shape: memref.shape.clone(),
            });
        }
    }

    for name in statement_order(scop) {
        let Some(stmt) = scop.statements.get(name) else {
            continue;
        };
        let (ranges, conditions, dims) = scope_bounds(stmt)?;
        let mut emitter = Emitter {
            scop,
            stmt,
            dims,
            graph: &mut graph,
            memo: HashMap::new(),
            visiting: HashSet::new(),
            nodes: Vec::new(),
        };
        emitter.statement()?;
        let nodes = emitter.nodes;
        trace!(statement = %name, nodes = nodes.len(), "emitted scope");
        graph.scopes.push(IterationScope {
            statement: name.to_string(),
            ranges,
            conditions,
            nodes,
        });
    }

    debug!(
        region = %scop.name,
        arrays = graph.arrays.len(),
        scopes = graph.scopes.len(),
        nodes = graph.nodes.len(),
        "generated dataflow graph"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use scop_ir::propagate;

    use super::*;

    fn region(domain: &str) -> Scop {
        let json = format!(
            r#"{{
                "name": "r",
                "context": "[n] -> {{  : n = 64 }}",
                "parameters": [{{ "name": "n", "variable": "i64 %n", "type": "i64" }}],
                "arrays": [
                    {{ "name": "A", "kind": "array", "sizes": ["*"], "type": "double" }},
                    {{ "name": "S__phi", "kind": "phi", "sizes": [], "type": "double" }}
                ],
                "instructions": "  %x = sitofp i64 %i to double\n  %y = fmul double %a, %x",
                "statements": [{{
                    "name": "S",
                    "domain": "{}",
                    "loops": [{{ "induction_variable": "%i = phi i64 [ 0, %e ], [ %i.n, %b ]" }}],
                    "accesses": [
                        {{ "kind": "read", "relation": "[n] -> {{ S[i0] -> A[i0] }}",
                           "access_instruction": "%a = load double, ptr %p" }},
                        {{ "kind": "write", "relation": "[n] -> {{ S[i0] -> A[1 + i0] }}",
                           "access_instruction": "store double %y, ptr %q",
                           "incoming_value": "double %y" }}
                    ]
                }}]
            }}"#,
            domain
        );
        let mut scop = Scop::from_json(&json).unwrap();
        propagate(&mut scop);
        scop
    }

    #[test]
    fn test_generate_scope() {
        let scop = region("[n] -> { S[i0] : 0 <= i0 < n }");
        let graph = generate(&scop).unwrap();

        assert_eq!(graph.arrays.keys().collect::<Vec<_>>(), vec!["A"]);
        let scope = &graph.scopes[0];
        assert_eq!(
            scope.ranges,
            vec![Range {
                dim: "i0".to_string(),
                lower: "0".to_string(),
                upper: "n - 1".to_string(),
            }]
        );
        // read, index, cast, multiply, write
        assert_eq!(scope.nodes.len(), 5);
        let (_, write) = graph.writes().next().unwrap();
        let node = graph.node(write).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Write {
                array: "A".to_string(),
                subscript: vec!["1 + i0".to_string()],
            }
        );
        assert_eq!(
            graph.expr(write).unwrap().to_string(),
            "(A[..] * ((double) i))"
        );
    }

    #[test]
    fn test_residual_condition() {
        let scop = region("[n] -> { S[i0] : 0 <= i0 < n and i0 != 7 }");
        let graph = generate(&scop).unwrap();
        assert_eq!(graph.scopes[0].conditions, vec!["i0 != 7"]);
    }

    #[test]
    fn test_unbounded_dimension() {
        let scop = region("[n] -> { S[i0] : i0 >= 0 }");
        let err = generate(&scop).unwrap_err();
        assert_eq!(err.category(), "GenerationDefect");
        assert!(err.to_string().contains("Dimension i0 of S"));
    }
}
