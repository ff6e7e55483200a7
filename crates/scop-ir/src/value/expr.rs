//! Expression trees.
//!
//! An [`Expr`] is the fully expanded form of a value: what a write stores,
//! spelled out down to reads, parameters, induction variables and constants.
//! Both the region and the generated dataflow graph derive expressions.
//! Operands are shared behind [`Arc`], so a value used twice is expanded
//! once.

use std::{fmt, sync::Arc};

use super::opcode::Opcode;
use crate::types::Type;

/// Expanded expression of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Literal constant
    Const(String),
    /// Region parameter, by SSA reference
    Param(String),
    /// Induction variable, by SSA reference
    Index(String),
    /// Read of an array element, by array name and defining reference
    Read { array: String, reference: String },
    /// Operation applied to operand expressions
    Op {
        opcode: Opcode,
        ty: Type,
        operands: Vec<Arc<Expr>>,
    },
    /// `cond ? if_true : if_false`
    Select {
        cond: Arc<Expr>,
        if_true: Arc<Expr>,
        if_false: Arc<Expr>,
    },
    /// A reference that never resolved
    Opaque(String),
}

impl Expr {
    /// Number of nodes in the fully expanded tree
    pub fn size(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Param(_) | Expr::Index(_) | Expr::Read { .. } | Expr::Opaque(_) => {
                1
            }
            Expr::Op { operands, .. } => 1 + operands.iter().map(|e| e.size()).sum::<usize>(),
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => 1 + cond.size() + if_true.size() + if_false.size(),
        }
    }

    /// Whether any `Select` occurs in the tree
    pub fn contains_select(&self) -> bool {
        match self {
            Expr::Select { .. } => true,
            Expr::Op { operands, .. } => operands.iter().any(|e| e.contains_select()),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(literal) => write!(f, "{}", literal),
            Expr::Param(name) | Expr::Index(name) | Expr::Opaque(name) => {
                write!(f, "{}", name.trim_start_matches('%'))
            }
            Expr::Read { array, .. } => write!(f, "{}[..]", array),
            Expr::Op {
                opcode,
                ty,
                operands,
            } => {
                let operands: Vec<String> = operands.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", opcode.render(*ty, &operands))
            }
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", cond, if_true, if_false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::opcode::FloatCC;

    fn read(array: &str) -> Expr {
        Expr::Read {
            array: array.to_string(),
            reference: format!("%{}", array.to_lowercase()),
        }
    }

    #[test]
    fn test_display_select() {
        let cond = Expr::Op {
            opcode: Opcode::FCmp(FloatCC::OrderedGreaterThan),
            ty: Type::Bool,
            operands: vec![Arc::new(read("A")), Arc::new(Expr::Const("0.0".to_string()))],
        };
        let expr = Expr::Op {
            opcode: Opcode::FAdd,
            ty: Type::Float(64),
            operands: vec![
                Arc::new(Expr::Select {
                    cond: Arc::new(cond),
                    if_true: Arc::new(read("B")),
                    if_false: Arc::new(read("A")),
                }),
                Arc::new(Expr::Const("1.0".to_string())),
            ],
        };
        assert_eq!(
            expr.to_string(),
            "(((A[..] > 0.0) ? B[..] : A[..]) + 1.0)"
        );
        assert_eq!(expr.size(), 8);
        assert!(expr.contains_select());
    }

    #[test]
    fn test_display_leaves() {
        assert_eq!(Expr::Index("%indvars.iv".to_string()).to_string(), "indvars.iv");
        assert_eq!(Expr::Param("%n".to_string()).to_string(), "n");
        assert!(!Expr::Const("1".to_string()).contains_select());
    }
}
