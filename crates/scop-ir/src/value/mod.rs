//! Value model.
//!
//! Every node of a lifted region is a [`ValueData`] in one arena. A value has
//! a reference (unique textual id within the region), a type, a kind, and an
//! ordered argument list of other values. Argument lists start out holding
//! [`ValueKind::Unresolved`] placeholders and are rewritten by propagation.

pub mod expr;
pub mod opcode;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use serde::Deserialize;

use crate::{
    entity::{EntityRef, ValueId},
    entity_map::PrimaryMap,
    types::Type,
};
use expr::Expr;
use opcode::Opcode;

/// Direction of a memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
        }
    }
}

/// Kind of a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Literal; owns no arguments
    Constant { literal: String },
    /// Placeholder awaiting resolution
    Unresolved,
    /// Symbolic region parameter
    Parameter { name: String },
    /// One evaluated operation; arguments are its operands in order
    Computation { opcode: Opcode, instruction: String },
    /// Read or write of an array element.
    ///
    /// A write's sole argument is the stored value.
    MemoryAccess {
        kind: AccessKind,
        array: String,
        instruction: String,
        incoming: Option<String>,
    },
    /// Controlling variable of a loop, by its defining `phi`
    InductionVariable { instruction: String },
    /// Reconstructed `phi`.
    ///
    /// With `select` the arguments are `[condition, if_true, if_false]`,
    /// otherwise the single forwarded value.
    Merge { select: bool, instruction: String },
}

/// Data of one value in the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueData {
    pub reference: String,
    pub ty: Type,
    pub kind: ValueKind,
    pub args: Vec<ValueId>,
}

impl ValueData {
    pub fn new(reference: impl Into<String>, ty: Type, kind: ValueKind) -> Self {
        Self {
            reference: reference.into(),
            ty,
            kind,
            args: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, ValueKind::Unresolved)
    }

    /// Whether this is a `read` memory access
    pub fn is_read(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::MemoryAccess {
                kind: AccessKind::Read,
                ..
            }
        )
    }

    /// Short name of the value kind
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Constant { .. } => "const",
            ValueKind::Unresolved => "unresolved",
            ValueKind::Parameter { .. } => "param",
            ValueKind::Computation { .. } => "compute",
            ValueKind::MemoryAccess {
                kind: AccessKind::Read,
                ..
            } => "read",
            ValueKind::MemoryAccess {
                kind: AccessKind::Write,
                ..
            } => "write",
            ValueKind::InductionVariable { .. } => "indvar",
            ValueKind::Merge { select: true, .. } => "select",
            ValueKind::Merge { select: false, .. } => "forward",
        }
    }
}

/// Outcome of validating a value's argument closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// A placeholder is reachable
    Unresolved(ValueId),
    /// The value reaches itself through this node
    Cycle(ValueId),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Arena of all values of a region
#[derive(Debug, Clone, Default)]
pub struct Values {
    arena: PrimaryMap<ValueId, ValueData>,
    constants: usize,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: ValueData) -> ValueId {
        self.arena.push(data)
    }

    /// Add a constant with a generated reference
    pub fn constant(&mut self, literal: &str, ty: Type) -> ValueId {
        let reference = format!("$c{}", self.constants);
        self.constants += 1;
        self.push(ValueData::new(
            reference,
            ty,
            ValueKind::Constant {
                literal: literal.to_string(),
            },
        ))
    }

    /// Add a placeholder for a textual reference
    pub fn placeholder(&mut self, reference: &str, ty: Type) -> ValueId {
        self.push(ValueData::new(reference, ty, ValueKind::Unresolved))
    }

    pub fn get(&self, id: ValueId) -> Option<&ValueData> {
        self.arena.get(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &ValueData)> {
        self.arena.iter()
    }

    /// Arguments of a value
    pub fn args(&self, id: ValueId) -> &[ValueId] {
        self.arena.get(id).map(|v| v.args.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn set_args(&mut self, id: ValueId, args: Vec<ValueId>) {
        if let Some(value) = self.arena.get_mut(id) {
            value.args = args;
        }
    }

    /// Check that no placeholder is reachable from `root` and that the
    /// argument graph below it is acyclic.
    ///
    /// Iterative depth-first search; the root itself may be a placeholder.
    pub fn validate(&self, root: ValueId) -> Validity {
        let mut marks: HashMap<ValueId, Mark> = HashMap::new();
        let mut stack: Vec<(ValueId, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Visiting);

        while let Some((id, next)) = stack.pop() {
            let Some(value) = self.arena.get(id) else {
                return Validity::Unresolved(id);
            };
            if value.is_placeholder() {
                return Validity::Unresolved(id);
            }
            match value.args.get(next) {
                Some(&child) => {
                    stack.push((id, next + 1));
                    match marks.get(&child) {
                        Some(Mark::Visiting) => return Validity::Cycle(child),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::Visiting);
                            stack.push((child, 0));
                        }
                    }
                }
                None => {
                    marks.insert(id, Mark::Done);
                }
            }
        }
        Validity::Valid
    }

    /// All values reachable from `roots` through arguments, roots included,
    /// in first-visit order.
    pub fn closure(&self, roots: &[ValueId]) -> Vec<ValueId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<ValueId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.args(id).iter().rev().copied());
        }
        order
    }

    /// Expand a value into an expression tree.
    ///
    /// Writes expand to their stored value and pass-through merges to their
    /// forwarded value. Shared arguments are expanded once and shared in the
    /// result. Returns the offending node if the value reaches itself.
    pub fn expr(&self, root: ValueId) -> Result<Expr, ValueId> {
        let mut memo = HashMap::new();
        let mut visiting = HashSet::new();
        self.expr_inner(root, &mut memo, &mut visiting)
            .map(Arc::unwrap_or_clone)
    }

    fn expr_inner(
        &self,
        id: ValueId,
        memo: &mut HashMap<ValueId, Arc<Expr>>,
        visiting: &mut HashSet<ValueId>,
    ) -> Result<Arc<Expr>, ValueId> {
        if let Some(expr) = memo.get(&id) {
            return Ok(Arc::clone(expr));
        }
        if !visiting.insert(id) {
            return Err(id);
        }
        let Some(value) = self.arena.get(id) else {
            return Err(id);
        };

        let mut operands = Vec::with_capacity(value.args.len());
        let forwards = matches!(
            value.kind,
            ValueKind::Merge { select: false, .. }
                | ValueKind::MemoryAccess {
                    kind: AccessKind::Write,
                    ..
                }
        );
        let leaf = matches!(
            value.kind,
            ValueKind::Constant { .. }
                | ValueKind::Unresolved
                | ValueKind::Parameter { .. }
                | ValueKind::InductionVariable { .. }
                | ValueKind::MemoryAccess {
                    kind: AccessKind::Read,
                    ..
                }
        );
        if !leaf {
            for &arg in &value.args {
                operands.push(self.expr_inner(arg, memo, visiting)?);
            }
        }

        let expr = match &value.kind {
            ValueKind::Constant { literal } => Arc::new(Expr::Const(literal.clone())),
            ValueKind::Unresolved => Arc::new(Expr::Opaque(value.reference.clone())),
            ValueKind::Parameter { .. } => Arc::new(Expr::Param(value.reference.clone())),
            ValueKind::InductionVariable { .. } => {
                Arc::new(Expr::Index(value.reference.clone()))
            }
            ValueKind::MemoryAccess {
                kind: AccessKind::Read,
                array,
                ..
            } => Arc::new(Expr::Read {
                array: array.clone(),
                reference: value.reference.clone(),
            }),
            ValueKind::Merge { select: true, .. } if operands.len() == 3 => {
                let mut it = operands.into_iter();
                match (it.next(), it.next(), it.next()) {
                    (Some(cond), Some(if_true), Some(if_false)) => Arc::new(Expr::Select {
                        cond,
                        if_true,
                        if_false,
                    }),
                    _ => Arc::new(Expr::Opaque(value.reference.clone())),
                }
            }
            _ if forwards && operands.len() == 1 => operands.remove(0),
            ValueKind::Computation { opcode, .. } => Arc::new(Expr::Op {
                opcode: opcode.clone(),
                ty: value.ty,
                operands,
            }),
            // Selections or writes that lost operands
            _ => Arc::new(Expr::Op {
                opcode: Opcode::Select,
                ty: value.ty,
                operands,
            }),
        };

        visiting.remove(&id);
        memo.insert(id, Arc::clone(&expr));
        Ok(expr)
    }

    /// Render a value as a C-like expression
    pub fn render(&self, id: ValueId) -> String {
        match self.expr(id) {
            Ok(expr) => expr.to_string(),
            Err(_) => self
                .get(id)
                .map(|v| v.reference.clone())
                .unwrap_or_else(|| id.to_string()),
        }
    }

    /// Ids in arena order
    pub fn keys(&self) -> impl Iterator<Item = ValueId> {
        (0..self.arena.len()).map(ValueId::from_index)
    }
}

impl std::ops::Index<ValueId> for Values {
    type Output = ValueData;

    fn index(&self, id: ValueId) -> &ValueData {
        &self.arena[id]
    }
}
