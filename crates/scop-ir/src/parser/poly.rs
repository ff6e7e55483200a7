//! Polyhedral set and map text.
//!
//! Domains, schedules, access relations, dependences and the context all use
//! isl notation:
//!
//! ```text
//! [n] -> { Stmt0[i0] : 0 <= i0 < n; Stmt1[i0] : i0 = 0 }
//! { Stmt0[i0] -> MemRef1[i0] }
//! {  :  }
//! ```
//!
//! The text is kept verbatim for forwarding. Parsing extracts parameters,
//! tuple names and dimensions, and the raw constraint text of each piece.
//! [`Piece::bounds`] turns conjunctions of comparison chains into
//! per-dimension bounds.

use std::fmt;

use nom::{
    bytes::complete::tag,
    character::complete::space0,
    combinator::opt,
    sequence::{terminated, tuple},
    IResult,
};

use super::{
    error::{parse_error, ParseError},
    primitives::bracketed,
};

/// A named or anonymous tuple (`Stmt0[i0, i1]`, `[i0, 1]`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuple {
    pub name: Option<String>,
    pub dims: Vec<String>,
}

impl Tuple {
    fn parse(text: &str) -> Result<Tuple, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Tuple::default());
        }
        let Some(open) = text.find('[') else {
            return Ok(Tuple {
                name: Some(text.to_string()),
                dims: Vec::new(),
            });
        };
        if !text.ends_with(']') {
            return Err(parse_error(text, &text[open..], "Unterminated tuple"));
        }
        let name = text[..open].trim();
        let dims = split_top(&text[open + 1..text.len() - 1], ",")
            .into_iter()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Tuple {
            name: (!name.is_empty()).then(|| name.to_string()),
            dims,
        })
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]",
            self.name.as_deref().unwrap_or(""),
            self.dims.join(", ")
        )
    }
}

/// One `;`-separated piece of a set or map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    /// The set tuple, or the domain tuple of a map
    pub input: Tuple,
    /// The range tuple of a map
    pub output: Option<Tuple>,
    /// Constraint text after `:`, if any
    pub constraints: Option<String>,
}

/// Per-dimension bounds derived from a piece's constraints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimBounds {
    pub name: String,
    /// Inclusive lower bound
    pub lower: Option<String>,
    /// Inclusive upper bound
    pub upper: Option<String>,
}

/// Bounds of every input dimension plus constraints that are not bounds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    pub dims: Vec<DimBounds>,
    pub conditions: Vec<String>,
}

/// A parsed polyhedral set or map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyExpr {
    pub params: Vec<String>,
    pub pieces: Vec<Piece>,
    text: String,
}

impl PolyExpr {
    /// The original text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the expression has no pieces (`{  }`)
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Names of all tuples, inputs and outputs
    pub fn tuple_names(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().flat_map(|piece| {
            piece
                .input
                .name
                .as_deref()
                .into_iter()
                .chain(piece.output.iter().filter_map(|t| t.name.as_deref()))
        })
    }

    /// The first piece whose input tuple has the given name
    pub fn piece(&self, name: &str) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|piece| piece.input.name.as_deref() == Some(name))
    }

    /// Rebuild the expression without the pieces mentioning any of `names`
    pub fn without(&self, names: &[String]) -> PolyExpr {
        let mentions = |t: &Tuple| t.name.as_ref().is_some_and(|n| names.contains(n));
        let pieces: Vec<Piece> = self
            .pieces
            .iter()
            .filter(|p| !mentions(&p.input) && !p.output.as_ref().is_some_and(mentions))
            .cloned()
            .collect();
        let mut expr = PolyExpr {
            params: self.params.clone(),
            pieces,
            text: String::new(),
        };
        expr.text = expr.to_string();
        expr
    }
}

impl fmt::Display for PolyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.params.is_empty() {
            write!(f, "[{}] -> ", self.params.join(", "))?;
        }
        if self.pieces.is_empty() {
            return write!(f, "{{  }}");
        }
        write!(f, "{{ ")?;
        for (i, piece) in self.pieces.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            let anonymous = piece.input == Tuple::default() && piece.output.is_none();
            if !anonymous {
                write!(f, "{}", piece.input)?;
            } else if piece.constraints.is_none() {
                write!(f, ":")?;
            }
            if let Some(output) = &piece.output {
                write!(f, " -> {}", output)?;
            }
            if let Some(constraints) = &piece.constraints {
                let sep = if anonymous { ": " } else { " : " };
                write!(f, "{}{}", sep, constraints)?;
            }
        }
        write!(f, " }}")
    }
}

/// Split at top-level occurrences of `sep` (outside brackets and parens)
pub(crate) fn split_top<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    let bytes = text.as_bytes();
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
        if depth == 0 && bytes[i..].starts_with(sep.as_bytes()) {
            parts.push(&text[start..i]);
            i += sep.len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

fn params(input: &str) -> IResult<&str, Option<&str>> {
    opt(terminated(
        |i| bracketed(i, '[', ']'),
        tuple((space0, tag("->"), space0)),
    ))(input)
}

fn parse_piece(text: &str) -> Result<Piece, ParseError> {
    let (head, constraints) = match split_top(text, ":").as_slice() {
        [head] => (*head, None),
        [head, rest @ ..] => {
            let constraints = rest.join(":").trim().to_string();
            (*head, (!constraints.is_empty()).then_some(constraints))
        }
        [] => (text, None),
    };
    let tuples = split_top(head, "->");
    let (input, output) = match tuples.as_slice() {
        [input] => (Tuple::parse(input)?, None),
        [input, output] => (Tuple::parse(input)?, Some(Tuple::parse(output)?)),
        _ => return Err(ParseError::new(format!("Nested relation in '{}'", text.trim()))),
    };
    Ok(Piece {
        input,
        output,
        constraints,
    })
}

/// Parse a polyhedral set or map.
pub fn parse_poly(text: &str) -> Result<PolyExpr, ParseError> {
    let trimmed = text.trim();
    let (rest, params) =
        params(trimmed).map_err(|_| parse_error(trimmed, trimmed, "Malformed parameter list"))?;
    let (rest, body) = bracketed(rest, '{', '}')
        .map_err(|_| parse_error(trimmed, rest, "Expected '{' ... '}'"))?;
    if !rest.trim().is_empty() {
        return Err(parse_error(
            trimmed,
            rest,
            &format!("Unexpected input after set: {}", rest.trim()),
        ));
    }

    let params = params
        .map(|p| {
            split_top(&p[1..p.len() - 1], ",")
                .into_iter()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let inner = body[1..body.len() - 1].trim();
    let mut pieces = Vec::new();
    if !inner.is_empty() {
        for piece in split_top(inner, ";") {
            if !piece.trim().is_empty() {
                pieces.push(parse_piece(piece)?);
            }
        }
    }

    Ok(PolyExpr {
        params,
        pieces,
        text: trimmed.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Cmp {
    fn symbol(self) -> &'static str {
        match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
            Cmp::Eq => "=",
        }
    }

    /// The same relation with operands swapped
    fn flip(self) -> Cmp {
        match self {
            Cmp::Lt => Cmp::Gt,
            Cmp::Le => Cmp::Ge,
            Cmp::Gt => Cmp::Lt,
            Cmp::Ge => Cmp::Le,
            Cmp::Eq => Cmp::Eq,
        }
    }
}

/// Split a comparison chain `0 <= i0 < n` into terms and operators
fn comparison_chain(text: &str) -> Option<(Vec<&str>, Vec<Cmp>)> {
    if text.contains("!=") {
        return None;
    }
    let mut terms = Vec::new();
    let mut ops = Vec::new();
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b'<' | b'>' | b'=' if depth == 0 => {
                let (op, len) = match (bytes[i], bytes.get(i + 1)) {
                    (b'<', Some(b'=')) => (Cmp::Le, 2),
                    (b'>', Some(b'=')) => (Cmp::Ge, 2),
                    (b'<', _) => (Cmp::Lt, 1),
                    (b'>', _) => (Cmp::Gt, 1),
                    _ => (Cmp::Eq, 1),
                };
                terms.push(text[start..i].trim());
                ops.push(op);
                i += len;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    terms.push(text[start..].trim());
    if ops.is_empty() || terms.iter().any(|t| t.is_empty()) {
        return None;
    }
    Some((terms, ops))
}

/// Offset an affine expression by a constant, folding integer literals
fn offset(expr: &str, delta: i64) -> String {
    match expr.trim().parse::<i64>() {
        Ok(value) => (value + delta).to_string(),
        Err(_) if delta < 0 => format!("{} - {}", expr.trim(), -delta),
        Err(_) => format!("{} + {}", expr.trim(), delta),
    }
}

impl Piece {
    /// Derive inclusive bounds for every input dimension.
    ///
    /// Each top-level `and` conjunct is read as a comparison chain; a link
    /// between a dimension and an expression becomes a bound of that
    /// dimension (strict bounds tightened by one). When both sides are
    /// dimensions the bound goes to the later one. Links that do not bound
    /// a dimension, or repeat an existing bound, are kept as conditions, as
    /// are disjunctions and existentials.
    pub fn bounds(&self) -> Bounds {
        let dims = &self.input.dims;
        let mut bounds = Bounds {
            dims: dims
                .iter()
                .map(|name| DimBounds {
                    name: name.clone(),
                    ..DimBounds::default()
                })
                .collect(),
            conditions: Vec::new(),
        };
        let Some(constraints) = &self.constraints else {
            return bounds;
        };
        if split_top(constraints, " or ").len() > 1 || constraints.contains("exists") {
            bounds.conditions.push(constraints.clone());
            return bounds;
        }

        for conjunct in split_top(constraints, " and ") {
            let conjunct = conjunct.trim();
            let Some((terms, ops)) = comparison_chain(conjunct) else {
                bounds.conditions.push(conjunct.to_string());
                continue;
            };
            for (k, op) in ops.iter().enumerate() {
                let (lhs, rhs) = (terms[k], terms[k + 1]);
                let lhs_dim = dims.iter().position(|d| d == lhs);
                let rhs_dim = dims.iter().position(|d| d == rhs);
                // Normalise to `dim op expr`
                let target = match (lhs_dim, rhs_dim) {
                    (Some(l), Some(r)) if r > l => Some((r, op.flip(), lhs)),
                    (Some(l), _) => Some((l, *op, rhs)),
                    (None, Some(r)) => Some((r, op.flip(), lhs)),
                    (None, None) => None,
                };
                let link = format!("{} {} {}", lhs, op.symbol(), rhs);
                let Some((dim, op, expr)) = target else {
                    bounds.conditions.push(link);
                    continue;
                };
                let entry = &mut bounds.dims[dim];
                let (lower, upper) = match op {
                    Cmp::Lt => (None, Some(offset(expr, -1))),
                    Cmp::Le => (None, Some(expr.to_string())),
                    Cmp::Gt => (Some(offset(expr, 1)), None),
                    Cmp::Ge => (Some(expr.to_string()), None),
                    Cmp::Eq => (Some(expr.to_string()), Some(expr.to_string())),
                };
                let clash = (lower.is_some() && entry.lower.is_some())
                    || (upper.is_some() && entry.upper.is_some());
                if clash {
                    bounds.conditions.push(link);
                    continue;
                }
                if lower.is_some() {
                    entry.lower = lower;
                }
                if upper.is_some() {
                    entry.upper = upper;
                }
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let set = parse_poly("{ Stmt0[i0] : 0 <= i0 <= 255 }").unwrap();
        assert!(set.params.is_empty());
        assert_eq!(set.pieces.len(), 1);
        let piece = &set.pieces[0];
        assert_eq!(piece.input.name.as_deref(), Some("Stmt0"));
        assert_eq!(piece.input.dims, vec!["i0"]);
        assert_eq!(piece.constraints.as_deref(), Some("0 <= i0 <= 255"));
        assert!(piece.output.is_none());
    }

    #[test]
    fn test_parse_map_with_params() {
        let map = parse_poly("[n, m] -> { Stmt_a[i0, i1] -> MemRef_A[i0, 1 + i1] }").unwrap();
        assert_eq!(map.params, vec!["n", "m"]);
        let output = map.pieces[0].output.as_ref().unwrap();
        assert_eq!(output.name.as_deref(), Some("MemRef_A"));
        assert_eq!(output.dims, vec!["i0", "1 + i1"]);
    }

    #[test]
    fn test_parse_union() {
        let schedule = parse_poly("{ Stmt1[i0] -> [i0, 1]; Stmt0[i0] -> [i0, 0] }").unwrap();
        assert_eq!(schedule.pieces.len(), 2);
        let names: Vec<_> = schedule.tuple_names().collect();
        assert_eq!(names, vec!["Stmt1", "Stmt0"]);
        assert_eq!(
            schedule.piece("Stmt0").unwrap().output.as_ref().unwrap().dims,
            vec!["i0", "0"]
        );
    }

    #[test]
    fn test_parse_empty_and_universe() {
        assert!(parse_poly("{  }").unwrap().is_empty());

        let context = parse_poly("{  :  }").unwrap();
        assert_eq!(context.pieces.len(), 1);
        assert_eq!(context.pieces[0].input, Tuple::default());
        assert_eq!(context.pieces[0].constraints, None);

        let context = parse_poly("[n] -> {  : n = 256 }").unwrap();
        assert_eq!(context.pieces[0].constraints.as_deref(), Some("n = 256"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_poly("Stmt0[i0]").is_err());
        assert!(parse_poly("{ Stmt0[i0] ").is_err());
        assert!(parse_poly("{ S[i0] } trailing").is_err());
    }

    #[test]
    fn test_bounds_inclusive() {
        let set = parse_poly("{ Stmt0[i0] : 0 <= i0 <= 255 }").unwrap();
        let bounds = set.pieces[0].bounds();
        assert_eq!(bounds.dims[0].lower.as_deref(), Some("0"));
        assert_eq!(bounds.dims[0].upper.as_deref(), Some("255"));
        assert!(bounds.conditions.is_empty());
    }

    #[test]
    fn test_bounds_strict_and_symbolic() {
        let set = parse_poly("[n] -> { S[i0, i1] : i0 > -1 and 0 <= i1 < n and i0 < 10 }").unwrap();
        let bounds = set.pieces[0].bounds();
        assert_eq!(bounds.dims[0].lower.as_deref(), Some("0"));
        assert_eq!(bounds.dims[0].upper.as_deref(), Some("9"));
        assert_eq!(bounds.dims[1].lower.as_deref(), Some("0"));
        assert_eq!(bounds.dims[1].upper.as_deref(), Some("n - 1"));
    }

    #[test]
    fn test_bounds_between_dims() {
        // Triangular nest: i1 runs up to i0
        let set = parse_poly("{ S[i0, i1] : 0 <= i0 <= 9 and 0 <= i1 <= i0 }").unwrap();
        let bounds = set.pieces[0].bounds();
        assert_eq!(bounds.dims[1].upper.as_deref(), Some("i0"));
        assert_eq!(bounds.dims[0].upper.as_deref(), Some("9"));
    }

    #[test]
    fn test_bounds_conditions() {
        let set =
            parse_poly("[n] -> { S[i0] : 0 <= i0 <= 9 and n >= 2 and i0 <= 5 and i0 % 2 }")
                .unwrap();
        let bounds = set.pieces[0].bounds();
        assert_eq!(bounds.dims[0].upper.as_deref(), Some("9"));
        assert_eq!(bounds.conditions, vec!["n >= 2", "i0 <= 5", "i0 % 2"]);

        let set = parse_poly("{ S[i0] : i0 = 3 or i0 = 5 }").unwrap();
        let bounds = set.pieces[0].bounds();
        assert_eq!(bounds.dims[0].lower, None);
        assert_eq!(bounds.conditions, vec!["i0 = 3 or i0 = 5"]);
    }

    #[test]
    fn test_without_statements() {
        let deps = parse_poly("{ Stmt0[i0] -> Stmt1[i0] : 0 <= i0 <= 255; Stmt1[i0] -> Stmt2[i0] }")
            .unwrap();
        let pruned = deps.without(&["Stmt0".to_string()]);
        assert_eq!(pruned.pieces.len(), 1);
        assert_eq!(pruned.text(), "{ Stmt1[i0] -> Stmt2[i0] }");
        assert_eq!(
            deps.without(&["Stmt1".to_string()]).text(),
            "{  }"
        );
    }

    #[test]
    fn test_split_top() {
        assert_eq!(split_top("a, f(b, c), d", ","), vec!["a", " f(b, c)", " d"]);
        assert_eq!(split_top("x", ";"), vec!["x"]);
    }
}
