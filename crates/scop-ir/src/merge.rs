//! Reconstruction of `phi` instructions as selections.
//!
//! A `phi` at the join of a two-way branch becomes `cond ? a : b`, using the
//! conditional branches seen earlier in the listing. Merges that cannot be
//! expressed that way (undefined incoming values, multi-way or loop-carried
//! joins) resolve to `None`.

use tracing::trace;

use crate::parser::{Incoming, Operand};

/// A conditional branch seen while scanning the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub cond: Operand,
    pub if_true: String,
    pub if_false: String,
}

/// A `phi` reduced to a pass-through or a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMerge {
    /// All incoming edges carry the same value
    Forward(Operand),
    /// `cond ? if_true : if_false`
    Select {
        cond: Operand,
        if_true: Operand,
        if_false: Operand,
    },
}

impl ResolvedMerge {
    /// Operands in argument order: condition first for selections
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            ResolvedMerge::Forward(value) => vec![value],
            ResolvedMerge::Select {
                cond,
                if_true,
                if_false,
            } => vec![cond, if_true, if_false],
        }
    }
}

fn value_at<'a>(incoming: &'a [Incoming], label: &str) -> Option<&'a Operand> {
    incoming
        .iter()
        .find(|edge| edge.label == label)
        .map(|edge| &edge.value)
}

/// Resolve a merge against the branches seen so far.
///
/// In order:
/// 1. any undefined incoming value fails;
/// 2. identical labels or identical values forward the first value;
/// 3. a branch whose two targets both appear among the incoming labels
///    selects `value@true : value@false`;
/// 4. the last incoming edge is matched against branch targets: on the true
///    target it is the true value and the first incoming value the false
///    one, on the false target the other way round;
/// 5. otherwise the merge is unrepresentable.
///
/// Step 4 depends on the order incoming edges are listed in.
pub fn resolve_merge(incoming: &[Incoming], branches: &[BranchContext]) -> Option<ResolvedMerge> {
    let (first, last) = (incoming.first()?, incoming.last()?);
    if incoming.iter().any(|edge| edge.value.is_undef()) {
        trace!("merge has an undefined incoming value");
        return None;
    }

    let same_label = incoming.iter().all(|edge| edge.label == first.label);
    let same_value = incoming.iter().all(|edge| edge.value == first.value);
    if same_label || same_value {
        return Some(ResolvedMerge::Forward(first.value.clone()));
    }

    for branch in branches {
        if branch.if_true == branch.if_false {
            continue;
        }
        if let (Some(if_true), Some(if_false)) = (
            value_at(incoming, &branch.if_true),
            value_at(incoming, &branch.if_false),
        ) {
            return Some(ResolvedMerge::Select {
                cond: branch.cond.clone(),
                if_true: if_true.clone(),
                if_false: if_false.clone(),
            });
        }
    }

    for branch in branches {
        if last.label == branch.if_true {
            return Some(ResolvedMerge::Select {
                cond: branch.cond.clone(),
                if_true: last.value.clone(),
                if_false: first.value.clone(),
            });
        } else if last.label == branch.if_false {
            return Some(ResolvedMerge::Select {
                cond: branch.cond.clone(),
                if_true: first.value.clone(),
                if_false: last.value.clone(),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> Operand {
        Operand::Ref(s.to_string())
    }

    fn edge(value: Operand, label: &str) -> Incoming {
        Incoming {
            value,
            label: label.to_string(),
        }
    }

    fn branch(cond: &str, if_true: &str, if_false: &str) -> BranchContext {
        BranchContext {
            cond: r(cond),
            if_true: if_true.to_string(),
            if_false: if_false.to_string(),
        }
    }

    #[test]
    fn test_identical_values_forward() {
        let incoming = [edge(r("%a"), "%x"), edge(r("%a"), "%y")];
        assert_eq!(
            resolve_merge(&incoming, &[]),
            Some(ResolvedMerge::Forward(r("%a")))
        );
    }

    #[test]
    fn test_identical_labels_forward_first() {
        let incoming = [edge(r("%a"), "%x"), edge(r("%b"), "%x")];
        assert_eq!(
            resolve_merge(&incoming, &[branch("%c", "%x", "%y")]),
            Some(ResolvedMerge::Forward(r("%a")))
        );
    }

    #[test]
    fn test_branch_reconstruction_true_value_first() {
        let branches = [branch("%c", "%then", "%else")];
        let expected = Some(ResolvedMerge::Select {
            cond: r("%c"),
            if_true: r("%v0"),
            if_false: r("%v1"),
        });

        let incoming = [edge(r("%v0"), "%then"), edge(r("%v1"), "%else")];
        assert_eq!(resolve_merge(&incoming, &branches), expected);

        // Incoming order does not matter
        let incoming = [edge(r("%v1"), "%else"), edge(r("%v0"), "%then")];
        assert_eq!(resolve_merge(&incoming, &branches), expected);
    }

    #[test]
    fn test_first_matching_branch_wins() {
        let branches = [
            branch("%unrelated", "%p", "%q"),
            branch("%c1", "%then", "%else"),
            branch("%c2", "%then", "%else"),
        ];
        let incoming = [edge(r("%a"), "%then"), edge(r("%b"), "%else")];
        match resolve_merge(&incoming, &branches) {
            Some(ResolvedMerge::Select { cond, .. }) => assert_eq!(cond, r("%c1")),
            other => panic!("Expected selection, got {:?}", other),
        }
    }

    #[test]
    fn test_heuristic_last_edge() {
        // Only the branch into %if.then is visible; the other edge comes
        // from a block that jumps unconditionally.
        let branches = [branch("%cmp", "%if.then", "%for.inc")];
        let incoming = [
            edge(r("%old"), "%crit_edge"),
            edge(r("%new"), "%if.then"),
        ];
        assert_eq!(
            resolve_merge(&incoming, &branches),
            Some(ResolvedMerge::Select {
                cond: r("%cmp"),
                if_true: r("%new"),
                if_false: r("%old"),
            })
        );

        let branches = [branch("%cmp", "%skip", "%if.else")];
        let incoming = [
            edge(r("%old"), "%crit_edge"),
            edge(r("%new"), "%if.else"),
        ];
        assert_eq!(
            resolve_merge(&incoming, &branches),
            Some(ResolvedMerge::Select {
                cond: r("%cmp"),
                if_true: r("%old"),
                if_false: r("%new"),
            })
        );
    }

    #[test]
    fn test_undefined_incoming_rejected() {
        let incoming = [
            edge(r("%a"), "%then"),
            edge(Operand::Literal("undef".to_string()), "%else"),
        ];
        assert_eq!(
            resolve_merge(&incoming, &[branch("%c", "%then", "%else")]),
            None
        );

        let incoming = [
            edge(Operand::Literal("poison".to_string()), "%then"),
            edge(Operand::Literal("poison".to_string()), "%else"),
        ];
        assert_eq!(resolve_merge(&incoming, &[]), None);
    }

    #[test]
    fn test_no_matching_branch() {
        let incoming = [
            edge(r("%a"), "%b0"),
            edge(r("%b"), "%b1"),
            edge(r("%c"), "%b2"),
        ];
        assert_eq!(
            resolve_merge(&incoming, &[branch("%x", "%p", "%q")]),
            None
        );
        assert_eq!(resolve_merge(&[], &[]), None);
    }

    #[test]
    fn test_operands_order() {
        let merge = ResolvedMerge::Select {
            cond: r("%c"),
            if_true: r("%t"),
            if_false: r("%f"),
        };
        let operands: Vec<_> = merge.operands().into_iter().map(|o| o.text()).collect();
        assert_eq!(operands, vec!["%c", "%t", "%f"]);
    }
}
