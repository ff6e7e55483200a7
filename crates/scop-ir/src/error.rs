//! Lift errors

use thiserror::Error;

use crate::parser::ParseError;

/// Lift result type
pub type Result<T> = std::result::Result<T, LiftError>;

/// Reasons a region cannot be lifted.
///
/// Every variant is terminal for the region it was raised for.
#[derive(Debug, Error)]
pub enum LiftError {
    /// Malformed extraction record, polyhedral text or instruction
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Every statement of the region depends on a merge that has no
    /// selection form
    #[error("unrepresentable merge in region {region}: dropped {statements:?}")]
    UnrepresentableMerge {
        region: String,
        statements: Vec<String>,
    },

    /// A placeholder survived propagation
    #[error("unresolved value {reference}: {message}")]
    UnresolvedValue { reference: String, message: String },

    /// Dangling statement, array or induction variable reference
    #[error("structural inconsistency: {0}")]
    StructuralInconsistency(String),

    /// The generated graph does not compute what the region computes
    #[error("generation defect: {0}")]
    GenerationDefect(String),

    /// The region has no iteration construct worth lifting
    #[error("region {0} is not profitable: no statement iterates")]
    Unprofitable(String),

    /// The external graph backend failed
    #[error("backend failure: {0}")]
    Backend(String),
}

impl LiftError {
    /// Short category name
    pub fn category(&self) -> &'static str {
        match self {
            LiftError::Parse(_) => "ParseError",
            LiftError::UnrepresentableMerge { .. } => "UnrepresentableMerge",
            LiftError::UnresolvedValue { .. } => "UnresolvedValue",
            LiftError::StructuralInconsistency(_) => "StructuralInconsistency",
            LiftError::GenerationDefect(_) => "GenerationDefect",
            LiftError::Unprofitable(_) => "Unprofitable",
            LiftError::Backend(_) => "Backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LiftError::from(ParseError::new("Unknown opcode: frob"));
        assert_eq!(
            err.to_string(),
            "parse error: Parse error at position 0: Unknown opcode: frob"
        );
        assert_eq!(err.category(), "ParseError");

        let err = LiftError::UnrepresentableMerge {
            region: "r".to_string(),
            statements: vec!["Stmt0".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unrepresentable merge in region r: dropped [\"Stmt0\"]"
        );
    }
}
