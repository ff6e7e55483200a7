//! Instruction line parsers.
//!
//! One line of the SSA listing (`%add = fadd double %0, 2.000000e+00`) parses
//! into an [`Instruction`]. Only the shape needed to rebuild data flow is
//! kept: result, type spelling, opcode and operands. Trailing attributes
//! (`, align 8`, `, !tbaa !5`, `#3`) are accepted and ignored.

use std::fmt;

use nom::{
    branch::alt,
    character::complete::{char, space0, space1},
    combinator::{map, map_opt, opt},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::{
    error::{parse_error, ParseError},
    primitives::{
        flags, global, identifier, is_pointer_type, keyword, label, literal, llvm_type, reference,
    },
    whitespace::comma,
};
use crate::value::opcode::{CastOp, FloatCC, IntCC, Opcode};

const FAST_MATH: &[&str] = &[
    "fast", "nnan", "ninf", "nsz", "arcp", "contract", "afn", "reassoc",
];

const INT_FLAGS: &[&str] = &["nuw", "nsw", "exact", "disjoint", "samesign", "nneg"];

const ARITH_FLAGS: &[&str] = &[
    "nuw", "nsw", "exact", "disjoint", "fast", "nnan", "ninf", "nsz", "arcp", "contract", "afn",
    "reassoc",
];

const PARAM_ATTRS: &[&str] = &[
    "noundef", "signext", "zeroext", "nonnull", "noalias", "nocapture", "readonly", "immarg",
    "inreg",
];

const CALL_ATTRS: &[&str] = &[
    "fast", "nnan", "ninf", "nsz", "arcp", "contract", "afn", "reassoc", "noundef", "signext",
    "zeroext", "nonnull", "noalias", "fastcc", "ccc",
];

/// An instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Local SSA reference or global symbol (`%add`, `@A`)
    Ref(String),
    /// Literal constant (`2.000000e+00`, `0`, `true`, `undef`)
    Literal(String),
}

impl Operand {
    /// Textual form as written in the listing
    pub fn text(&self) -> &str {
        match self {
            Operand::Ref(text) | Operand::Literal(text) => text,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Operand::Ref(_))
    }

    /// Whether this operand is an undefined-value marker
    pub fn is_undef(&self) -> bool {
        matches!(self, Operand::Literal(text) if text == "undef" || text == "poison")
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// One incoming `[ value, label ]` pair of a `phi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub value: Operand,
    pub label: String,
}

/// An operand with the type spelling it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typed {
    pub ty: String,
    pub value: Operand,
}

impl Typed {
    pub fn new(ty: &str, value: Operand) -> Self {
        Self {
            ty: ty.to_string(),
            value,
        }
    }
}

/// Parsed instruction line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `%r = phi ty [ v0, %l0 ], [ v1, %l1 ], ...`
    Phi {
        result: String,
        ty: String,
        incoming: Vec<Incoming>,
    },
    /// `br i1 %c, label %t, label %f`
    CondBranch {
        cond: Operand,
        if_true: String,
        if_false: String,
    },
    /// `br label %t`
    Branch { target: String },
    /// `%r = load ty, ptr %p`
    Load {
        result: String,
        ty: String,
        address: Operand,
    },
    /// `store ty %v, ptr %p`
    Store {
        ty: String,
        value: Operand,
        address: Operand,
    },
    /// Instruction producing a pointer (`getelementptr`, `alloca`, pointer casts)
    Address { result: String, opcode: String },
    /// Any instruction computing a scalar value
    Compute {
        result: String,
        ty: String,
        opcode: Opcode,
        operands: Vec<Typed>,
    },
    /// Instruction without a data result (`ret`, `unreachable`, void calls)
    Effect { opcode: String },
}

impl Instruction {
    /// The SSA reference defined by this instruction, if any
    pub fn result(&self) -> Option<&str> {
        match self {
            Instruction::Phi { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::Address { result, .. }
            | Instruction::Compute { result, .. } => Some(result),
            Instruction::CondBranch { .. }
            | Instruction::Branch { .. }
            | Instruction::Store { .. }
            | Instruction::Effect { .. } => None,
        }
    }
}

/// Parse an operand (reference, global or literal)
fn operand(input: &str) -> IResult<&str, Operand> {
    alt((
        map(reference, |r: &str| Operand::Ref(r.to_string())),
        map(global, |g: &str| Operand::Ref(g.to_string())),
        map(literal, |l: &str| Operand::Literal(l.to_string())),
    ))(input)
}

/// Parse a typed operand (`double %0`, `i64 noundef 1`), returning (type, operand)
fn typed_operand(input: &str) -> IResult<&str, (&str, Operand)> {
    let (input, ty) = terminated(llvm_type, space1)(input)?;
    let (input, _) = flags(PARAM_ATTRS)(input)?;
    let (input, value) = operand(input)?;
    Ok((input, (ty, value)))
}

/// Parse `[ value, label ]`
fn incoming(input: &str) -> IResult<&str, Incoming> {
    map(
        delimited(
            pair(char('['), space0),
            separated_pair(operand, comma, reference),
            pair(space0, char(']')),
        ),
        |(value, label)| Incoming {
            value,
            label: label.to_string(),
        },
    )(input)
}

fn parse_phi<'a>(input: &'a str, result: &str) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(FAST_MATH)(input)?;
    let (input, ty) = terminated(llvm_type, space1)(input)?;
    let (input, incoming) = separated_list1(comma, incoming)(input)?;
    let inst = if is_pointer_type(ty) {
        Instruction::Address {
            result: result.to_string(),
            opcode: "phi".to_string(),
        }
    } else {
        Instruction::Phi {
            result: result.to_string(),
            ty: ty.to_string(),
            incoming,
        }
    };
    Ok((input, inst))
}

fn parse_branch(input: &str) -> IResult<&str, Instruction> {
    alt((
        map(label, |target| Instruction::Branch {
            target: target.to_string(),
        }),
        map(
            tuple((typed_operand, comma, label, comma, label)),
            |((_, cond), _, if_true, _, if_false)| Instruction::CondBranch {
                cond,
                if_true: if_true.to_string(),
                if_false: if_false.to_string(),
            },
        ),
    ))(input)
}

fn parse_load<'a>(input: &'a str, result: &str) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(&["volatile", "atomic"])(input)?;
    let (input, ty) = llvm_type(input)?;
    let (input, (_, address)) = preceded(comma, typed_operand)(input)?;
    let inst = if is_pointer_type(ty) {
        Instruction::Address {
            result: result.to_string(),
            opcode: "load".to_string(),
        }
    } else {
        Instruction::Load {
            result: result.to_string(),
            ty: ty.to_string(),
            address,
        }
    };
    Ok((input, inst))
}

fn parse_store(input: &str) -> IResult<&str, Instruction> {
    let (input, _) = flags(&["volatile", "atomic"])(input)?;
    let (input, (ty, value)) = typed_operand(input)?;
    let (input, (_, address)) = preceded(comma, typed_operand)(input)?;
    Ok((
        input,
        Instruction::Store {
            ty: ty.to_string(),
            value,
            address,
        },
    ))
}

fn compute(result: &str, ty: &str, opcode: Opcode, operands: Vec<Typed>) -> Instruction {
    if is_pointer_type(ty) {
        Instruction::Address {
            result: result.to_string(),
            opcode: opcode.to_string(),
        }
    } else {
        Instruction::Compute {
            result: result.to_string(),
            ty: ty.to_string(),
            opcode,
            operands,
        }
    }
}

fn parse_binary<'a>(input: &'a str, result: &str, opcode: Opcode) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(ARITH_FLAGS)(input)?;
    let (input, (ty, lhs)) = typed_operand(input)?;
    let (input, rhs) = preceded(comma, operand)(input)?;
    let operands = vec![Typed::new(ty, lhs), Typed::new(ty, rhs)];
    Ok((input, compute(result, ty, opcode, operands)))
}

fn parse_icmp<'a>(input: &'a str, result: &str) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(INT_FLAGS)(input)?;
    let (input, cc) = map_opt(terminated(identifier, space1), IntCC::parse)(input)?;
    let (input, (ty, lhs)) = typed_operand(input)?;
    let (input, rhs) = preceded(comma, operand)(input)?;
    let operands = vec![Typed::new(ty, lhs), Typed::new(ty, rhs)];
    Ok((input, compute(result, "i1", Opcode::ICmp(cc), operands)))
}

fn parse_fcmp<'a>(input: &'a str, result: &str) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(FAST_MATH)(input)?;
    let (input, cc) = map_opt(terminated(identifier, space1), FloatCC::parse)(input)?;
    let (input, (ty, lhs)) = typed_operand(input)?;
    let (input, rhs) = preceded(comma, operand)(input)?;
    let operands = vec![Typed::new(ty, lhs), Typed::new(ty, rhs)];
    Ok((input, compute(result, "i1", Opcode::FCmp(cc), operands)))
}

fn parse_select<'a>(input: &'a str, result: &str) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(FAST_MATH)(input)?;
    let (input, (cond_ty, cond)) = typed_operand(input)?;
    let (input, (ty, if_true)) = preceded(comma, typed_operand)(input)?;
    let (input, (_, if_false)) = preceded(comma, typed_operand)(input)?;
    let operands = vec![
        Typed::new(cond_ty, cond),
        Typed::new(ty, if_true),
        Typed::new(ty, if_false),
    ];
    Ok((input, compute(result, ty, Opcode::Select, operands)))
}

fn parse_cast<'a>(input: &'a str, result: &str, cast: CastOp) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(INT_FLAGS)(input)?;
    let (input, (from, value)) = typed_operand(input)?;
    let (input, to) = preceded(tuple((space1, keyword("to"), space1)), llvm_type)(input)?;
    let inst = if is_pointer_type(from) {
        Instruction::Address {
            result: result.to_string(),
            opcode: cast.mnemonic().to_string(),
        }
    } else {
        compute(result, to, Opcode::Cast(cast), vec![Typed::new(from, value)])
    };
    Ok((input, inst))
}

fn parse_unary<'a>(input: &'a str, result: &str, opcode: Opcode) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(FAST_MATH)(input)?;
    let (input, (ty, value)) = typed_operand(input)?;
    Ok((input, compute(result, ty, opcode, vec![Typed::new(ty, value)])))
}

fn parse_call<'a>(input: &'a str, result: Option<&str>) -> IResult<&'a str, Instruction> {
    let (input, _) = flags(CALL_ATTRS)(input)?;
    let (input, ty) = terminated(llvm_type, space1)(input)?;
    let (input, callee) = alt((global, reference))(input)?;
    let (input, args) = delimited(
        pair(char('('), space0),
        separated_list0(comma, typed_operand),
        pair(space0, char(')')),
    )(input)?;

    let inst = match result {
        Some(result) if ty != "void" => compute(
            result,
            ty,
            Opcode::Call(callee[1..].to_string()),
            args.into_iter()
                .map(|(arg_ty, arg)| Typed::new(arg_ty, arg))
                .collect(),
        ),
        _ => Instruction::Effect {
            opcode: "call".to_string(),
        },
    };
    Ok((input, inst))
}

/// Whether the text left after an instruction is only attributes or metadata
fn is_trailer(rest: &str) -> bool {
    let rest = rest.trim();
    rest.is_empty() || rest.starts_with(',') || rest.starts_with('#') || rest.starts_with('!')
}

/// Parse one line of the SSA listing.
pub fn parse_instruction(line: &str) -> Result<Instruction, ParseError> {
    let text = line.trim();
    let assignment: IResult<&str, Option<&str>> =
        opt(terminated(reference, delimited(space0, char('='), space0)))(text);
    let (rest, result) = assignment.map_err(|_| parse_error(text, text, "Malformed instruction"))?;

    let opcode_start = rest;
    let (mut rest, mut opcode) = terminated(identifier, space0)(rest)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| {
            parse_error(text, rest, "Expected opcode")
        })?;
    if matches!(opcode, "tail" | "musttail" | "notail") {
        let (after, word) = terminated(identifier, space0)(rest).map_err(
            |_: nom::Err<nom::error::Error<&str>>| parse_error(text, rest, "Expected call after tail marker"),
        )?;
        rest = after;
        opcode = word;
    }

    let parsed = match (result, opcode) {
        (Some(r), "phi") => parse_phi(rest, r),
        (None, "br") => parse_branch(rest),
        (Some(r), "load") => parse_load(rest, r),
        (None, "store") => parse_store(rest),
        (Some(r), "getelementptr" | "alloca" | "inttoptr" | "ptrtoint" | "addrspacecast") => {
            Ok((
                "",
                Instruction::Address {
                    result: r.to_string(),
                    opcode: opcode.to_string(),
                },
            ))
        }
        (Some(r), "icmp") => parse_icmp(rest, r),
        (Some(r), "fcmp") => parse_fcmp(rest, r),
        (Some(r), "select") => parse_select(rest, r),
        (Some(r), "fneg") => parse_unary(rest, r, Opcode::FNeg),
        (Some(r), "freeze") => parse_unary(rest, r, Opcode::Freeze),
        (result, "call") => parse_call(rest, result),
        (None, "ret" | "unreachable" | "switch" | "fence" | "resume") => Ok((
            "",
            Instruction::Effect {
                opcode: opcode.to_string(),
            },
        )),
        (Some(r), other) => {
            if let Some(cast) = CastOp::parse(other) {
                parse_cast(rest, r, cast)
            } else if let Some(binary) = Opcode::binary(other) {
                parse_binary(rest, r, binary)
            } else {
                return Err(parse_error(
                    text,
                    opcode_start,
                    &format!("Unknown opcode: {}", other),
                ));
            }
        }
        (None, other) => {
            return Err(parse_error(
                text,
                opcode_start,
                &format!("Unknown opcode: {}", other),
            ))
        }
    };

    match parsed {
        Ok((remaining, inst)) if is_trailer(remaining) => Ok(inst),
        Ok((remaining, _)) => Err(parse_error(
            text,
            remaining,
            &format!("Unexpected input after {}: {}", opcode, remaining),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(parse_error(
            text,
            e.input,
            &format!("Malformed {} instruction", opcode),
        )),
        Err(nom::Err::Incomplete(_)) => Err(parse_error(
            text,
            "",
            &format!("Incomplete {} instruction", opcode),
        )),
    }
}
