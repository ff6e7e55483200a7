//! File-based tests for region lifting.
//!
//! Similar to Cranelift's filetests, these tests read `.scop` files that contain:
//! - A test command (`test resolve` or `test lift`) and optional `set` lines
//! - Extraction records, each introduced by a `region` line
//! - Filecheck directives in comments after each record

pub mod filecheck;
pub mod parser;

mod test_lift;
mod test_resolve;

pub use filecheck::match_filecheck;
pub use parser::{parse_test_file, TestCase, TestFile};

/// Run every case of a test file, dispatching on its command
pub fn run_test_file(content: &str) {
    let file = parse_test_file(content).unwrap_or_else(|e| panic!("Malformed test file: {}", e));
    assert!(!file.cases.is_empty(), "No test cases found in test file");

    for case in &file.cases {
        match file.command.as_str() {
            "test resolve" => test_resolve::run_resolve_test(case, &file.options),
            "test lift" => test_lift::run_lift_test(case, &file.options),
            other => panic!("Unexpected test command: {}", other),
        }
    }
}
