//! Argument closure validation.
//!
//! Every computation and access must be free of placeholders and cycles.

use crate::{
    region::Scop,
    value::Validity,
    verifier::{VerifierError, VerifierErrorKind},
};

/// Verify that every computation and access validates
pub fn verify_values(scop: &Scop, errors: &mut Vec<VerifierError>) {
    for (reference, &id) in &scop.computations {
        check(scop, id, reference.clone(), errors);
    }
    for stmt in scop.statements.values() {
        for (key, access) in &stmt.accesses {
            check(scop, access.value, format!("{}/{}", stmt.name, key), errors);
        }
    }
}

fn check(scop: &Scop, id: crate::entity::ValueId, location: String, errors: &mut Vec<VerifierError>) {
    match scop.values.validate(id) {
        Validity::Valid => {}
        Validity::Unresolved(placeholder) => errors.push(VerifierError::with_location(
            VerifierErrorKind::UnresolvedValue,
            format!(
                "Unresolved reference {} in argument closure",
                scop.values[placeholder].reference
            ),
            location,
        )),
        Validity::Cycle(node) => errors.push(VerifierError::with_location(
            VerifierErrorKind::Cycle,
            format!(
                "Value {} depends on itself",
                scop.values[node].reference
            ),
            location,
        )),
    }
}
