//! Dataflow graph.
//!
//! The graph mirrors what a region computes: declared arrays, one iteration
//! scope per statement, and nodes connected by ordered input edges. Nodes
//! live in one arena; each scope lists the nodes it owns.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use indexmap::IndexMap;
use scop_ir::{EntityRef, Expr, Extent, Opcode, PrimaryMap, Type, ValueId};

/// Node entity reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl EntityRef for NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A materialized array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDecl {
    pub name: String,
    /// Element type spelling
    pub element: String,
    pub shape: Vec<Extent>,
}

/// Inclusive iteration range of one dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub dim: String,
    pub lower: String,
    pub upper: String,
}

/// The iteration space of one statement and the nodes evaluated in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationScope {
    pub statement: String,
    pub ranges: Vec<Range>,
    /// Constraints that are not bounds of a single dimension
    pub conditions: Vec<String>,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Array element read
    Read {
        array: String,
        subscript: Vec<String>,
        /// Reference of the read in the region
        reference: String,
    },
    /// Array element write; the single input is the stored value
    Write { array: String, subscript: Vec<String> },
    Compute { opcode: Opcode },
    /// Inputs: condition, true value, false value
    Select,
    Constant { literal: String },
    /// Region parameter
    Symbol { name: String, reference: String },
    /// Iteration index of a scope dimension
    Index { dim: String, reference: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Type,
    /// Input edges in slot order
    pub inputs: Vec<NodeId>,
    /// Region value the node was generated from
    pub origin: ValueId,
}

/// Dataflow graph of one region
#[derive(Debug, Clone)]
pub struct DataflowGraph {
    pub name: String,
    pub arrays: IndexMap<String, ArrayDecl>,
    pub scopes: Vec<IterationScope>,
    pub nodes: PrimaryMap<NodeId, Node>,
}

impl DataflowGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arrays: IndexMap::new(),
            scopes: Vec::new(),
            nodes: PrimaryMap::new(),
        }
    }

    pub fn declare_array(&mut self, array: ArrayDecl) {
        self.arrays.insert(array.name.clone(), array);
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn inputs(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.inputs.as_slice()).unwrap_or(&[])
    }

    /// Write nodes of every scope, in scope order
    pub fn writes(&self) -> impl Iterator<Item = (&IterationScope, NodeId)> {
        self.scopes.iter().flat_map(move |scope| {
            scope.nodes.iter().copied().filter_map(move |id| {
                matches!(self.node(id)?.kind, NodeKind::Write { .. }).then_some((scope, id))
            })
        })
    }

    /// Re-derive the expression a node computes.
    ///
    /// A write derives the expression of its stored value. Shared inputs are
    /// expanded once. Returns `None` if a node is missing, has the wrong
    /// number of inputs, or reaches itself.
    pub fn expr(&self, id: NodeId) -> Option<Expr> {
        let mut memo = HashMap::new();
        let mut visiting = HashSet::new();
        self.expr_inner(id, &mut memo, &mut visiting)
            .map(Arc::unwrap_or_clone)
    }

    fn expr_inner(
        &self,
        id: NodeId,
        memo: &mut HashMap<NodeId, Arc<Expr>>,
        visiting: &mut HashSet<NodeId>,
    ) -> Option<Arc<Expr>> {
        if let Some(expr) = memo.get(&id) {
            return Some(Arc::clone(expr));
        }
        if !visiting.insert(id) {
            return None;
        }
        let node = self.node(id)?;
        let mut operands = Vec::with_capacity(node.inputs.len());
        for &input in &node.inputs {
            operands.push(self.expr_inner(input, memo, visiting)?);
        }

        let expr = match (&node.kind, operands.len()) {
            (NodeKind::Read { array, reference, .. }, _) => Arc::new(Expr::Read {
                array: array.clone(),
                reference: reference.clone(),
            }),
            (NodeKind::Write { .. }, 1) => operands.remove(0),
            (NodeKind::Compute { opcode }, _) => Arc::new(Expr::Op {
                opcode: opcode.clone(),
                ty: node.ty,
                operands,
            }),
            (NodeKind::Select, 3) => {
                let if_false = operands.pop()?;
                let if_true = operands.pop()?;
                let cond = operands.pop()?;
                Arc::new(Expr::Select {
                    cond,
                    if_true,
                    if_false,
                })
            }
            (NodeKind::Write { .. } | NodeKind::Select, _) => return None,
            (NodeKind::Constant { literal }, _) => Arc::new(Expr::Const(literal.clone())),
            (NodeKind::Symbol { reference, .. }, _) => Arc::new(Expr::Param(reference.clone())),
            (NodeKind::Index { reference, .. }, _) => Arc::new(Expr::Index(reference.clone())),
        };

        visiting.remove(&id);
        memo.insert(id, Arc::clone(&expr));
        Some(expr)
    }
}

fn subscript(array: &str, subscript: &[String]) -> String {
    format!("{}[{}]", array, subscript.join(", "))
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Read {
                array,
                subscript: s,
                reference,
            } => write!(f, "read {} ({})", subscript(array, s), reference),
            NodeKind::Write {
                array,
                subscript: s,
            } => write!(f, "write {}", subscript(array, s)),
            NodeKind::Compute { opcode } => write!(f, "{}", opcode),
            NodeKind::Select => write!(f, "select"),
            NodeKind::Constant { literal } => write!(f, "const {}", literal),
            NodeKind::Symbol { name, .. } => write!(f, "symbol {}", name),
            NodeKind::Index { dim, .. } => write!(f, "index {}", dim),
        }
    }
}

impl fmt::Display for DataflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph {}", self.name)?;
        for array in self.arrays.values() {
            write!(f, "array {}: {}", array.name, array.element)?;
            for extent in &array.shape {
                write!(f, "[{}]", extent)?;
            }
            writeln!(f)?;
        }
        for scope in &self.scopes {
            write!(f, "scope {}", scope.statement)?;
            for range in &scope.ranges {
                write!(f, " [{} <= {} <= {}]", range.lower, range.dim, range.upper)?;
            }
            for condition in &scope.conditions {
                write!(f, " if {}", condition)?;
            }
            writeln!(f)?;
            for &id in &scope.nodes {
                let Some(node) = self.node(id) else {
                    continue;
                };
                write!(f, "  {} = {}", id, node.kind)?;
                if !node.inputs.is_empty() {
                    let inputs: Vec<String> = node.inputs.iter().map(|i| i.to_string()).collect();
                    write!(f, " {}", inputs.join(", "))?;
                }
                writeln!(f, " : {}", node.ty)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind, ty: Type, inputs: Vec<NodeId>) -> Node {
        Node {
            kind,
            ty,
            inputs,
            origin: ValueId::new(0),
        }
    }

    #[test]
    fn test_expr_of_write() {
        let mut graph = DataflowGraph::new("g");
        let read = graph.add_node(node(
            NodeKind::Read {
                array: "A".to_string(),
                subscript: vec!["i0".to_string()],
                reference: "%a".to_string(),
            },
            Type::Float(64),
            vec![],
        ));
        let two = graph.add_node(node(
            NodeKind::Constant {
                literal: "2.0".to_string(),
            },
            Type::Float(64),
            vec![],
        ));
        let mul = graph.add_node(node(
            NodeKind::Compute {
                opcode: Opcode::FMul,
            },
            Type::Float(64),
            vec![read, two],
        ));
        let write = graph.add_node(node(
            NodeKind::Write {
                array: "B".to_string(),
                subscript: vec!["i0".to_string()],
            },
            Type::Float(64),
            vec![mul],
        ));

        assert_eq!(graph.expr(write), graph.expr(mul));
        assert_eq!(graph.expr(write).unwrap().to_string(), "(A[..] * 2.0)");
    }

    #[test]
    fn test_expr_of_doubling_chain() {
        let mut graph = DataflowGraph::new("g");
        let mut top = graph.add_node(node(
            NodeKind::Constant {
                literal: "1.0".to_string(),
            },
            Type::Float(64),
            vec![],
        ));
        for _ in 0..48 {
            top = graph.add_node(node(
                NodeKind::Compute {
                    opcode: Opcode::FAdd,
                },
                Type::Float(64),
                vec![top, top],
            ));
        }

        let Some(Expr::Op { operands, .. }) = graph.expr(top) else {
            panic!("Expected operation");
        };
        assert!(Arc::ptr_eq(&operands[0], &operands[1]));
    }

    #[test]
    fn test_malformed_select_has_no_expr() {
        let mut graph = DataflowGraph::new("g");
        let c = graph.add_node(node(
            NodeKind::Constant {
                literal: "true".to_string(),
            },
            Type::Bool,
            vec![],
        ));
        let select = graph.add_node(node(NodeKind::Select, Type::Float(64), vec![c, c]));
        assert_eq!(graph.expr(select), None);
    }

    #[test]
    fn test_display() {
        let mut graph = DataflowGraph::new("g");
        graph.declare_array(ArrayDecl {
            name: "A".to_string(),
            element: "double".to_string(),
            shape: vec![Extent::Unranked],
        });
        let c = graph.add_node(node(
            NodeKind::Constant {
                literal: "0.0".to_string(),
            },
            Type::Float(64),
            vec![],
        ));
        let w = graph.add_node(node(
            NodeKind::Write {
                array: "A".to_string(),
                subscript: vec!["i0".to_string()],
            },
            Type::Float(64),
            vec![c],
        ));
        graph.scopes.push(IterationScope {
            statement: "S".to_string(),
            ranges: vec![Range {
                dim: "i0".to_string(),
                lower: "0".to_string(),
                upper: "n - 1".to_string(),
            }],
            conditions: vec![],
            nodes: vec![c, w],
        });
        assert_eq!(
            graph.to_string(),
            "graph g\n\
             array A: double[*]\n\
             scope S [0 <= i0 <= n - 1]\n  \
             n0 = const 0.0 : double\n  \
             n1 = write A[i0] n0 : double\n"
        );
    }
}
