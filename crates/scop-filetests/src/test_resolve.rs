//! The `resolve` subtest - region building, propagation and verification

use scop_dfg::{resolve, LiftOptions};
use scop_ir::{ExtractionRecord, LiftError};

use crate::{filecheck::match_filecheck, parser::TestCase};

/// Output of one case: the region dump, or the error it fails with
pub fn resolve_output(record_text: &str, options: &LiftOptions) -> String {
    let result = ExtractionRecord::from_json(record_text)
        .map_err(LiftError::from)
        .and_then(|record| resolve(&record, options));
    match result {
        Ok((scop, report)) => {
            let mut output = scop.to_string();
            for dropped in &report.dropped {
                output.push_str(&format!(
                    "dropped reference {} in {}\n",
                    dropped.reference, dropped.owner
                ));
            }
            output
        }
        Err(e) => format!("error: {}: {}\n", e.category(), e),
    }
}

/// Run a single resolve test
pub fn run_resolve_test(case: &TestCase, options: &LiftOptions) {
    let actual = resolve_output(&case.record_text, options);
    if let Err(e) = match_filecheck(&actual, &case.expected_text) {
        panic!(
            "Resolve test '{}' (line {}) failed:\n{}\n\nActual:\n{}",
            case.label, case.line, e, actual
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::run_test_file;

    #[test]
    fn test_resolve_merges() {
        run_test_file(include_str!("../filetests/resolve/merges.scop"));
    }

    #[test]
    fn test_resolve_references() {
        run_test_file(include_str!("../filetests/resolve/references.scop"));
    }

    #[test]
    fn test_resolve_errors() {
        run_test_file(include_str!("../filetests/resolve/errors.scop"));
    }
}
