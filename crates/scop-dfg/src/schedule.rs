//! Statement ordering from the schedule.

use std::cmp::Ordering;

use scop_ir::Scop;

/// One component of a schedule vector.
///
/// Integers order before symbols; integers numerically, symbols textually.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Component {
    Int(i64),
    Symbol(String),
}

impl Component {
    fn parse(text: &str) -> Component {
        let text = text.trim();
        match text.parse() {
            Ok(n) => Component::Int(n),
            Err(_) => Component::Symbol(text.to_string()),
        }
    }
}

/// Schedule vector of a statement, if the schedule maps it
pub fn schedule_vector(scop: &Scop, statement: &str) -> Option<Vec<Component>> {
    let piece = scop.schedule.piece(statement)?;
    let output = piece.output.as_ref()?;
    Some(output.dims.iter().map(|d| Component::parse(d)).collect())
}

/// Statement names in execution order.
///
/// Schedule vectors compare lexicographically. Statements the schedule does
/// not mention come last; ties keep declaration order.
pub fn statement_order(scop: &Scop) -> Vec<&str> {
    let mut keyed: Vec<(Option<Vec<Component>>, &str)> = scop
        .statements
        .keys()
        .map(|name| (schedule_vector(scop, name), name.as_str()))
        .collect();
    // Stable sort keeps declaration order for equal keys
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    keyed.into_iter().map(|(_, name)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scop(schedule: &str, statements: &[&str]) -> Scop {
        let statements: Vec<String> = statements
            .iter()
            .map(|name| format!(r#"{{ "name": "{}", "domain": "{{ {}[] }}" }}"#, name, name))
            .collect();
        let json = format!(
            r#"{{ "name": "r", "schedule": "{}", "statements": [{}] }}"#,
            schedule,
            statements.join(", ")
        );
        Scop::from_json(&json).unwrap()
    }

    #[test]
    fn test_numeric_components() {
        let scop = scop(
            "{ Stmt1[i0] -> [i0, 1]; Stmt0[i0] -> [i0, 0]; Stmt2[i0] -> [i0, 10] }",
            &["Stmt2", "Stmt1", "Stmt0"],
        );
        assert_eq!(statement_order(&scop), vec!["Stmt0", "Stmt1", "Stmt2"]);
    }

    #[test]
    fn test_outer_component_first() {
        let scop = scop(
            "{ A[i0] -> [1, i0, 0]; B[i0] -> [0, i0, 5] }",
            &["A", "B"],
        );
        assert_eq!(statement_order(&scop), vec!["B", "A"]);
    }

    #[test]
    fn test_integers_before_symbols() {
        let scop = scop("{ A[] -> [n]; B[] -> [3] }", &["A", "B"]);
        assert_eq!(statement_order(&scop), vec!["B", "A"]);
    }

    #[test]
    fn test_unscheduled_last_and_ties_stable() {
        let scop = scop("{ B[] -> [0]; C[] -> [0] }", &["A", "C", "B"]);
        assert_eq!(statement_order(&scop), vec!["C", "B", "A"]);
    }
}
