//! Parsers for the textual parts of an extraction record.
//!
//! - SSA instruction lines (LLVM textual form)
//! - isl-style polyhedral sets and maps

mod error;
mod instructions;
mod poly;
mod primitives;
mod whitespace;

pub use error::ParseError;
pub use instructions::{parse_instruction, Incoming, Instruction, Operand, Typed};
pub use poly::{parse_poly, Bounds, DimBounds, Piece, PolyExpr, Tuple};

/// Split an instruction listing into non-empty lines.
///
/// Listings embedded in JSON sometimes carry the two-character escape `\n`
/// instead of a newline; both separate lines.
pub fn listing_lines(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .split('\n')
        .flat_map(|line| line.split("\\n"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// Parse every line of an instruction listing into (line, instruction)
/// pairs.
pub fn parse_listing(listing: &str) -> Result<Vec<(&str, Instruction)>, ParseError> {
    listing_lines(listing)
        .enumerate()
        .map(|(index, line)| {
            parse_instruction(line).map(|inst| (line, inst)).map_err(|e| ParseError {
                message: format!("line {}: {} ('{}')", index + 1, e.message, line),
                position: e.position,
            })
        })
        .collect()
}

/// Extract the SSA reference a printed value denotes.
///
/// Values are printed either as a full instruction (`%x = phi i64 ...`) or
/// as a typed operand (`i32 %n`, `double 2.0`). Returns `None` for literals.
pub fn defined_reference(text: &str) -> Option<&str> {
    let text = text.trim();
    if let Some((lhs, _)) = text.split_once('=') {
        let lhs = lhs.trim();
        if lhs.starts_with('%') && !lhs.contains(' ') {
            return Some(lhs);
        }
    }
    text.split_whitespace()
        .rev()
        .find(|word| word.starts_with('%') || word.starts_with('@'))
        .map(|word| word.trim_end_matches(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_lines() {
        let listing = "  %a = fadd double %x, 1.0\\n  br label %next\n\n  ret void\n";
        let lines: Vec<_> = listing_lines(listing).collect();
        assert_eq!(
            lines,
            vec!["%a = fadd double %x, 1.0", "br label %next", "ret void"]
        );
    }

    #[test]
    fn test_parse_listing_reports_line() {
        let err = parse_listing("br label %a\n%b = bogus i32 %c").unwrap_err();
        assert!(err.message.starts_with("line 2: Unknown opcode: bogus"));
    }

    #[test]
    fn test_defined_reference() {
        assert_eq!(
            defined_reference("  %indvars.iv = phi i64 [ 0, %entry ], [ %next, %body ]"),
            Some("%indvars.iv")
        );
        assert_eq!(defined_reference("i32 %n"), Some("%n"));
        assert_eq!(defined_reference("  %A = alloca [256 x double], align 16"), Some("%A"));
        assert_eq!(defined_reference("ptr @global"), Some("@global"));
        assert_eq!(defined_reference("double 2.000000e+00"), None);
    }
}
