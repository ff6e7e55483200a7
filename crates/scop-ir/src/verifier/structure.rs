//! Structural validation.
//!
//! Checks that statements, arrays and induction variables referenced
//! anywhere in the region are declared, and that shapes agree.

use crate::{
    region::{Scop, Statement},
    value::ValueKind,
    verifier::{VerifierError, VerifierErrorKind},
};

fn structure_error(message: String, location: &str) -> VerifierError {
    VerifierError::with_location(VerifierErrorKind::Structure, message, location.to_string())
}

/// Verify statement, array and loop references
pub fn verify_structure(scop: &Scop, errors: &mut Vec<VerifierError>) {
    for stmt in scop.statements.values() {
        verify_domain(stmt, errors);
        verify_accesses(scop, stmt, errors);
        verify_loops(scop, stmt, errors);
    }

    for name in scop.schedule.tuple_names() {
        if !scop.statements.contains_key(name) {
            errors.push(structure_error(
                format!("Schedule references undeclared statement {}", name),
                "schedule",
            ));
        }
    }
    for (dep, relation) in scop.dependences.iter() {
        for name in relation.tuple_names() {
            if !scop.statements.contains_key(name) {
                errors.push(structure_error(
                    format!("Dependence references undeclared statement {}", name),
                    dep,
                ));
            }
        }
    }
}

fn verify_domain(stmt: &Statement, errors: &mut Vec<VerifierError>) {
    for piece in &stmt.domain.pieces {
        match &piece.input.name {
            Some(name) if name == &stmt.name => {}
            other => errors.push(structure_error(
                format!(
                    "Domain names {} instead of its statement",
                    other.as_deref().unwrap_or("an anonymous tuple")
                ),
                &stmt.name,
            )),
        }
        let dims = piece.input.dims.len();
        if dims > stmt.depth {
            errors.push(structure_error(
                format!(
                    "Domain has {} dimensions but only {} loops bind them",
                    dims, stmt.depth
                ),
                &stmt.name,
            ));
        }
    }
}

fn verify_accesses(scop: &Scop, stmt: &Statement, errors: &mut Vec<VerifierError>) {
    for (key, access) in &stmt.accesses {
        let location = format!("{}/{}", stmt.name, key);
        let Some((array, _)) = scop.access_array(access.value) else {
            errors.push(structure_error("Access is not a memory access".to_string(), &location));
            continue;
        };
        let Some(memref) = scop.memrefs.get(array) else {
            errors.push(structure_error(
                format!("Access targets undeclared array {}", array),
                &location,
            ));
            continue;
        };
        for piece in &access.relation.pieces {
            if piece.input.name.as_deref() != Some(stmt.name.as_str()) {
                errors.push(structure_error(
                    "Access relation does not start at its statement".to_string(),
                    &location,
                ));
            }
            let arity = piece.output.as_ref().map_or(0, |t| t.dims.len());
            if arity != memref.rank() {
                errors.push(structure_error(
                    format!(
                        "Access to {} has {} subscripts but the array has rank {}",
                        array,
                        arity,
                        memref.rank()
                    ),
                    &location,
                ));
            }
        }
    }
}

fn verify_loops(scop: &Scop, stmt: &Statement, errors: &mut Vec<VerifierError>) {
    let roots: Vec<_> = stmt.accesses.values().map(|access| access.value).collect();
    for id in scop.values.closure(&roots) {
        let value = &scop.values[id];
        if matches!(value.kind, ValueKind::InductionVariable { .. })
            && !stmt.loops.contains_key(&value.reference)
        {
            errors.push(structure_error(
                format!(
                    "Induction variable {} is not bound by a loop of this statement",
                    value.reference
                ),
                &stmt.name,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagate::propagate;

    const TWO_LOOPS: &str = r#"{
        "name": "r",
        "arrays": [
            { "name": "A", "kind": "array", "sizes": ["*", "16"], "type": "double" },
            { "name": "B", "kind": "array", "sizes": ["*"], "type": "double" }
        ],
        "schedule": "{ S[i0] -> [0, i0]; T[i0] -> [1, i0] }",
        "dependencies": { "RAW": "{ S[i0] -> U[i0] }" },
        "instructions": "  %v = sitofp i64 %j to double",
        "statements": [
            {
                "name": "S",
                "domain": "{ S[i0] : 0 <= i0 <= 15 }",
                "loops": [{ "induction_variable": "%i = phi i64 [ 0, %a ], [ %i1, %b ]" }],
                "accesses": [{
                    "kind": "write", "relation": "{ S[i0] -> B[i0] }",
                    "access_instruction": "store double %v, ptr %p",
                    "incoming_value": "  %v = sitofp i64 %j to double"
                }]
            },
            {
                "name": "T",
                "domain": "{ T[i0] : 0 <= i0 <= 15 }",
                "loops": [{ "induction_variable": "%j = phi i64 [ 0, %c ], [ %j1, %d ]" }],
                "accesses": [{
                    "kind": "write", "relation": "{ T[i0] -> A[i0] }",
                    "access_instruction": "store double 0.0, ptr %q"
                }]
            }
        ]
    }"#;

    fn errors() -> Vec<VerifierError> {
        let mut scop = Scop::from_json(TWO_LOOPS).unwrap();
        propagate(&mut scop);
        let mut errors = Vec::new();
        verify_structure(&scop, &mut errors);
        errors
    }

    #[test]
    fn test_foreign_induction_variable() {
        let errors = errors();
        assert!(errors.iter().any(|e| e.location.as_deref() == Some("S")
            && e.message.contains("%j")));
    }

    #[test]
    fn test_rank_mismatch() {
        let errors = errors();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("1 subscripts but the array has rank 2")));
    }

    #[test]
    fn test_undeclared_statement_in_dependences() {
        let errors = errors();
        assert!(errors
            .iter()
            .any(|e| e.location.as_deref() == Some("RAW") && e.message.contains("U")));
        assert!(!errors.iter().any(|e| e.location.as_deref() == Some("schedule")));
    }
}
