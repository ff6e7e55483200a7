//! The `lift` subtest - dataflow graph generation

use scop_dfg::{lift, LiftOptions};

use crate::{filecheck::match_filecheck, parser::TestCase};

/// Output of one case: the graph dump, or the error it fails with
pub fn lift_output(record_text: &str, options: &LiftOptions) -> String {
    match lift(record_text, options) {
        Ok(lifted) => lifted.graph.to_string(),
        Err(e) => format!("error: {}: {}\n", e.category(), e),
    }
}

/// Run a single lift test
pub fn run_lift_test(case: &TestCase, options: &LiftOptions) {
    let actual = lift_output(&case.record_text, options);
    if let Err(e) = match_filecheck(&actual, &case.expected_text) {
        panic!(
            "Lift test '{}' (line {}) failed:\n{}\n\nActual:\n{}",
            case.label, case.line, e, actual
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::run_test_file;

    #[test]
    fn test_lift_branch() {
        run_test_file(include_str!("../filetests/lift/branch.scop"));
    }

    #[test]
    fn test_lift_stencil() {
        run_test_file(include_str!("../filetests/lift/stencil.scop"));
    }

    #[test]
    fn test_lift_prune() {
        run_test_file(include_str!("../filetests/lift/prune.scop"));
    }
}
