//! Whitespace parsing utilities.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace1, space0},
    combinator::{map, recognize},
    multi::many0,
    sequence::delimited,
    IResult,
};

/// Parse whitespace (spaces, tabs, newlines) - returns the matched string
pub(crate) fn blank_space(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((
        map(multispace1, |_| ()),
        map(tag("\\n"), |_| ()), // Escaped newline left over from JSON embedding
    ))))(input)
}

/// Parse whitespace and discard result - returns ()
/// This is the main whitespace parser to use throughout
pub(crate) fn blank(input: &str) -> IResult<&str, ()> {
    map(blank_space, |_| ())(input)
}

/// Parse a comma surrounded by optional spaces
pub(crate) fn comma(input: &str) -> IResult<&str, char> {
    delimited(space0, char(','), space0)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_space() {
        assert_eq!(blank_space("   "), Ok(("", "   ")));
        assert_eq!(blank_space("\n\t  "), Ok(("", "\n\t  ")));
        assert_eq!(blank_space("  %0"), Ok(("%0", "  ")));
        assert_eq!(blank_space(""), Ok(("", "")));
    }

    #[test]
    fn test_blank() {
        assert_eq!(blank("   "), Ok(("", ())));
        assert_eq!(blank("  %0"), Ok(("%0", ())));
    }

    #[test]
    fn test_comma() {
        assert_eq!(comma(" , %1"), Ok(("%1", ',')));
        assert_eq!(comma(",%1"), Ok(("%1", ',')));
        assert!(comma("%1").is_err());
    }
}
