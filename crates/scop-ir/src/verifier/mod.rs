//! Region verifier.

use std::fmt;

use crate::{error::LiftError, region::Scop};

mod structure;
mod values;

pub use structure::verify_structure;
pub use values::verify_values;

/// Category of a verifier error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierErrorKind {
    /// A placeholder is reachable from a computation or access
    UnresolvedValue,
    /// A value reaches itself through its arguments
    Cycle,
    /// Dangling statement, array or induction variable reference
    Structure,
}

/// Verifier error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierError {
    pub kind: VerifierErrorKind,
    /// Error message describing what's wrong
    pub message: String,
    /// Optional location information (e.g., "Stmt0", "Stmt0/%add")
    pub location: Option<String>,
}

impl VerifierError {
    pub fn new(kind: VerifierErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            location: None,
        }
    }

    pub fn with_location(kind: VerifierErrorKind, message: String, location: String) -> Self {
        Self {
            kind,
            message,
            location: Some(location),
        }
    }
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl From<VerifierError> for LiftError {
    fn from(error: VerifierError) -> Self {
        match error.kind {
            VerifierErrorKind::UnresolvedValue => LiftError::UnresolvedValue {
                reference: error.location.clone().unwrap_or_default(),
                message: error.message,
            },
            VerifierErrorKind::Cycle | VerifierErrorKind::Structure => {
                LiftError::StructuralInconsistency(error.to_string())
            }
        }
    }
}

/// Verify a region is well-formed.
///
/// Runs every check and returns all errors found. Nothing is repaired.
pub fn verify(scop: &Scop) -> Result<(), Vec<VerifierError>> {
    let mut errors = Vec::new();

    verify_values(scop, &mut errors);
    verify_structure(scop, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Verify a region, reporting the first error as a lift error
pub fn verify_region(scop: &Scop) -> Result<(), LiftError> {
    verify(scop).map_err(|errors| {
        for error in &errors {
            tracing::debug!(%error, "verifier error");
        }
        errors
            .into_iter()
            .next()
            .map(LiftError::from)
            .unwrap_or_else(|| LiftError::StructuralInconsistency(scop.name.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagate::propagate;

    fn region(write_incoming: &str, loops: &str) -> Scop {
        let json = format!(
            r#"{{
                "name": "r",
                "arrays": [{{ "name": "A", "kind": "array", "sizes": ["*"], "type": "double" }}],
                "schedule": "{{ S[i0] -> [i0] }}",
                "instructions": "  %y = fmul double %a, 2.0",
                "statements": [{{
                    "name": "S",
                    "domain": "{{ S[i0] : 0 <= i0 <= 9 }}",
                    "loops": [{}],
                    "accesses": [
                        {{ "kind": "read", "relation": "{{ S[i0] -> A[i0] }}",
                           "access_instruction": "%a = load double, ptr %p" }},
                        {{ "kind": "write", "relation": "{{ S[i0] -> A[i0] }}",
                           "access_instruction": "store double %y, ptr %p",
                           "incoming_value": "{}" }}
                    ]
                }}]
            }}"#,
            loops, write_incoming
        );
        let mut scop = Scop::from_json(&json).unwrap();
        propagate(&mut scop);
        scop
    }

    const LOOP: &str = r#"{ "induction_variable": "%i = phi i64 [ 0, %entry ], [ %i.next, %body ]" }"#;

    #[test]
    fn test_verify_valid_region() {
        let scop = region("  %y = fmul double %a, 2.0", LOOP);
        assert_eq!(verify(&scop), Ok(()));
    }

    #[test]
    fn test_unbound_domain_dimension() {
        let scop = region("  %y = fmul double %a, 2.0", "");
        let errors = verify(&scop).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == VerifierErrorKind::Structure && e.message.contains("dimension")));
    }

    #[test]
    fn test_first_error_category() {
        let scop = region("  %y = fmul double %a, 2.0", "");
        let err = verify_region(&scop).unwrap_err();
        assert_eq!(err.category(), "StructuralInconsistency");
    }
}
