//! Value propagation.
//!
//! Replaces every placeholder argument with the value its reference names.
//! The rewrite is planned against an immutable view of the region and then
//! applied, so lookups never observe a half-rewritten region.

use tracing::{debug, trace, warn};

use crate::{entity::ValueId, region::Scop};

/// An argument removed because nothing in the region defines it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedReference {
    /// Reference of the value that owned the argument
    pub owner: String,
    pub reference: String,
}

/// What one propagation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Placeholders replaced by their producer
    pub substituted: usize,
    pub dropped: Vec<DroppedReference>,
}

impl PropagationReport {
    /// Whether the pass changed nothing
    pub fn is_noop(&self) -> bool {
        self.substituted == 0 && self.dropped.is_empty()
    }
}

/// Producer of a reference; first match wins
fn lookup(scop: &Scop, reference: &str) -> Option<ValueId> {
    scop.parameters
        .get(reference)
        .map(|param| param.value)
        .or_else(|| scop.computations.get(reference).copied())
        .or_else(|| scop.find_read(reference))
        .or_else(|| scop.find_induction_variable(reference))
}

/// Resolve placeholder arguments of every computation and access.
///
/// Arguments that name nothing are dropped and reported. Running the pass
/// again on its own output is a no-op.
pub fn propagate(scop: &mut Scop) -> PropagationReport {
    let mut report = PropagationReport::default();
    let mut plan: Vec<(ValueId, Vec<ValueId>)> = Vec::new();

    for owner in scop.argument_owners() {
        let args = scop.values.args(owner);
        if !args.iter().any(|&arg| scop.values[arg].is_placeholder()) {
            continue;
        }
        let owner_ref = &scop.values[owner].reference;
        let mut resolved = Vec::with_capacity(args.len());
        for &arg in args {
            let value = &scop.values[arg];
            if !value.is_placeholder() {
                resolved.push(arg);
                continue;
            }
            match lookup(scop, &value.reference) {
                Some(producer) => {
                    trace!(
                        owner = %owner_ref,
                        reference = %value.reference,
                        producer = scop.values[producer].kind_name(),
                        "resolved argument"
                    );
                    report.substituted += 1;
                    resolved.push(producer);
                }
                None => {
                    warn!(
                        owner = %owner_ref,
                        reference = %value.reference,
                        "dropping argument with no producer in the region"
                    );
                    report.dropped.push(DroppedReference {
                        owner: owner_ref.clone(),
                        reference: value.reference.clone(),
                    });
                }
            }
        }
        plan.push((owner, resolved));
    }

    for (owner, args) in plan {
        scop.values.set_args(owner, args);
    }
    debug!(
        substituted = report.substituted,
        dropped = report.dropped.len(),
        "propagated values"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn scop(json: &str) -> Scop {
        Scop::from_json(json).unwrap()
    }

    const PRECEDENCE: &str = r#"{
        "name": "precedence",
        "context": "[n] -> {  : n > 0 }",
        "parameters": [{ "name": "n", "variable": "i64 %n", "type": "i64" }],
        "arrays": [{ "name": "A", "kind": "array", "sizes": ["*"], "type": "i64",
                     "variable": "ptr %A" }],
        "instructions": "  %n = add i64 %m, 1\n  %x = mul i64 %n, %iv\n  store i64 %x, ptr %p",
        "schedule": "[n] -> { S[i0] -> [i0] }",
        "statements": [{
            "name": "S",
            "domain": "[n] -> { S[i0] : 0 <= i0 < n }",
            "loops": [{ "induction_variable": "%iv = phi i64 [ 0, %entry ], [ %iv.next, %body ]" }],
            "accesses": [{
                "kind": "write",
                "relation": "[n] -> { S[i0] -> A[i0] }",
                "access_instruction": "store i64 %x, ptr %p",
                "incoming_value": "  %x = mul i64 %n, %iv"
            }]
        }]
    }"#;

    #[test]
    fn test_parameter_wins_over_computation() {
        let mut scop = scop(PRECEDENCE);
        let report = propagate(&mut scop);

        let x = scop.computations["%x"];
        let args = scop.values.args(x);
        assert_eq!(args.len(), 2);
        assert!(matches!(
            scop.values[args[0]].kind,
            ValueKind::Parameter { .. }
        ));
        assert!(matches!(
            scop.values[args[1]].kind,
            ValueKind::InductionVariable { .. }
        ));
        // %m names nothing in the region
        assert_eq!(
            report.dropped,
            vec![DroppedReference {
                owner: "%n".to_string(),
                reference: "%m".to_string(),
            }]
        );
    }

    #[test]
    fn test_propagation_is_idempotent() {
        let mut scop = scop(PRECEDENCE);
        let first = propagate(&mut scop);
        assert!(!first.is_noop());
        let rendered = scop.to_string();

        let second = propagate(&mut scop);
        assert!(second.is_noop());
        assert_eq!(scop.to_string(), rendered);
    }

    #[test]
    fn test_write_resolves_through_computation() {
        let mut scop = scop(PRECEDENCE);
        propagate(&mut scop);
        let stmt = &scop.statements["S"];
        let (_, write) = stmt.writes(&scop.values).next().unwrap();
        assert!(scop.values.validate(write.value).is_valid());
        assert_eq!(scop.values.render(write.value), "(n * iv)");
    }
}
