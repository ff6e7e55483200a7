//! Primitive parsers for references, labels, types and literals.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, space1},
    combinator::{map, not, peek, recognize, verify},
    error::{Error, ErrorKind},
    multi::many0,
    number::complete::recognize_float,
    sequence::{pair, preceded, terminated},
    IResult,
};

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '$')
}

/// Parse a local SSA reference (`%add`, `%0`, `%indvars.iv55`)
pub(crate) fn reference(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('%'), take_while1(is_name_char)))(input)
}

/// Parse a global symbol (`@exp`, `@llvm.fmuladd.f64`)
pub(crate) fn global(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('@'), take_while1(is_name_char)))(input)
}

/// Parse a bare identifier (keywords, opcodes, flags)
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parse a specific keyword, refusing to match a prefix of a longer word
pub(crate) fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(peek(take_while1(is_name_char))))
}

/// Parse a branch target (`label %if.then`), returning the label reference
pub(crate) fn label(input: &str) -> IResult<&str, &str> {
    preceded(pair(keyword("label"), space1), reference)(input)
}

/// Consume a balanced bracketed group such as `[256 x double]` or `(ptr, ...)`
pub(crate) fn bracketed(input: &str, open: char, close: char) -> IResult<&str, &str> {
    if !input.starts_with(open) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                let end = i + c.len_utf8();
                return Ok((&input[end..], &input[..end]));
            }
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)))
}

/// Parse a type spelling (`double`, `i64`, `ptr`, `[256 x double]`, `<4 x float>`)
pub(crate) fn llvm_type(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((
            |i| bracketed(i, '[', ']'),
            |i| bracketed(i, '<', '>'),
            |i| bracketed(i, '{', '}'),
            identifier,
        )),
        many0(char('*')),
    ))(input)
}

/// Whether a type spelling denotes a pointer
pub(crate) fn is_pointer_type(ty: &str) -> bool {
    ty == "ptr" || ty.starts_with("ptr ") || ty.ends_with('*')
}

const LITERAL_KEYWORDS: &[&str] = &[
    "true",
    "false",
    "undef",
    "poison",
    "null",
    "zeroinitializer",
];

fn hex_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        tag("0x"),
        take_while1(|c: char| c.is_ascii_hexdigit() || matches!(c, 'K' | 'L' | 'M' | 'H' | 'R')),
    ))(input)
}

/// Parse a literal operand (integers, floats, hex floats, `true`, `undef`, ...)
pub(crate) fn literal(input: &str) -> IResult<&str, &str> {
    alt((
        hex_literal,
        recognize_float,
        verify(identifier, |word: &str| LITERAL_KEYWORDS.contains(&word)),
    ))(input)
}

/// Parse a flag word from the given set followed by whitespace
pub(crate) fn flag<'a>(set: &'static [&'static str]) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(verify(identifier, move |word: &str| set.contains(&word)), space1)
}

/// Skip any number of flag words from the given set
pub(crate) fn flags<'a>(set: &'static [&'static str]) -> impl FnMut(&'a str) -> IResult<&'a str, ()> {
    map(many0(flag(set)), |_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference() {
        assert_eq!(reference("%add"), Ok(("", "%add")));
        assert_eq!(reference("%0, %1"), Ok((", %1", "%0")));
        assert_eq!(reference("%indvars.iv.next56 "), Ok((" ", "%indvars.iv.next56")));
        assert!(reference("add").is_err());
        assert!(reference("%").is_err());
    }

    #[test]
    fn test_global() {
        assert_eq!(global("@llvm.fmuladd.f64("), Ok(("(", "@llvm.fmuladd.f64")));
        assert!(global("%x").is_err());
    }

    #[test]
    fn test_keyword_does_not_match_prefix() {
        assert_eq!(keyword("label")("label %x"), Ok((" %x", "label")));
        assert!(keyword("label")("labels %x").is_err());
    }

    #[test]
    fn test_label() {
        assert_eq!(label("label %if.then, x"), Ok((", x", "%if.then")));
        assert!(label("%if.then").is_err());
    }

    #[test]
    fn test_llvm_type() {
        assert_eq!(llvm_type("double %0"), Ok((" %0", "double")));
        assert_eq!(
            llvm_type("[256 x double], ptr %A"),
            Ok((", ptr %A", "[256 x double]"))
        );
        assert_eq!(llvm_type("<4 x float> %v"), Ok((" %v", "<4 x float>")));
        assert_eq!(llvm_type("i8** %p"), Ok((" %p", "i8**")));
        assert!(is_pointer_type("ptr"));
        assert!(is_pointer_type("i8*"));
        assert!(!is_pointer_type("double"));
    }

    #[test]
    fn test_literal() {
        assert_eq!(literal("0, x"), Ok((", x", "0")));
        assert_eq!(literal("-12"), Ok(("", "-12")));
        assert_eq!(literal("2.000000e+00"), Ok(("", "2.000000e+00")));
        assert_eq!(literal("0x3FF0000000000000"), Ok(("", "0x3FF0000000000000")));
        assert_eq!(literal("undef ]"), Ok((" ]", "undef")));
        assert_eq!(literal("true"), Ok(("", "true")));
        assert!(literal("%x").is_err());
        assert!(literal("label").is_err());
    }

    #[test]
    fn test_flags() {
        const SET: &[&str] = &["nuw", "nsw"];
        assert_eq!(flags(SET)("nuw nsw i64 %a"), Ok(("i64 %a", ())));
        assert_eq!(flags(SET)("i64 %a"), Ok(("i64 %a", ())));
    }

    #[test]
    fn test_bracketed_unbalanced() {
        assert!(bracketed("[256 x double", '[', ']').is_err());
        assert!(bracketed("double", '[', ']').is_err());
        assert_eq!(bracketed("(a, (b)) c", '(', ')'), Ok((" c", "(a, (b))")));
    }
}
