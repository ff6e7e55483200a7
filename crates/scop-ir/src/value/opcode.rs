//! Operation codes of computations.

use std::fmt;

use crate::types::Type;

/// Integer comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntCC {
    Equal,
    NotEqual,
    UnsignedGreaterThan,
    UnsignedGreaterThanOrEqual,
    UnsignedLessThan,
    UnsignedLessThanOrEqual,
    SignedGreaterThan,
    SignedGreaterThanOrEqual,
    SignedLessThan,
    SignedLessThanOrEqual,
}

impl IntCC {
    /// Parse an `icmp` predicate mnemonic
    pub fn parse(text: &str) -> Option<IntCC> {
        Some(match text {
            "eq" => IntCC::Equal,
            "ne" => IntCC::NotEqual,
            "ugt" => IntCC::UnsignedGreaterThan,
            "uge" => IntCC::UnsignedGreaterThanOrEqual,
            "ult" => IntCC::UnsignedLessThan,
            "ule" => IntCC::UnsignedLessThanOrEqual,
            "sgt" => IntCC::SignedGreaterThan,
            "sge" => IntCC::SignedGreaterThanOrEqual,
            "slt" => IntCC::SignedLessThan,
            "sle" => IntCC::SignedLessThanOrEqual,
            _ => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            IntCC::Equal => "eq",
            IntCC::NotEqual => "ne",
            IntCC::UnsignedGreaterThan => "ugt",
            IntCC::UnsignedGreaterThanOrEqual => "uge",
            IntCC::UnsignedLessThan => "ult",
            IntCC::UnsignedLessThanOrEqual => "ule",
            IntCC::SignedGreaterThan => "sgt",
            IntCC::SignedGreaterThanOrEqual => "sge",
            IntCC::SignedLessThan => "slt",
            IntCC::SignedLessThanOrEqual => "sle",
        }
    }

    /// C-like comparison operator
    pub fn symbol(&self) -> &'static str {
        match self {
            IntCC::Equal => "==",
            IntCC::NotEqual => "!=",
            IntCC::UnsignedGreaterThan | IntCC::SignedGreaterThan => ">",
            IntCC::UnsignedGreaterThanOrEqual | IntCC::SignedGreaterThanOrEqual => ">=",
            IntCC::UnsignedLessThan | IntCC::SignedLessThan => "<",
            IntCC::UnsignedLessThanOrEqual | IntCC::SignedLessThanOrEqual => "<=",
        }
    }
}

/// Floating point comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatCC {
    False,
    OrderedEqual,
    OrderedGreaterThan,
    OrderedGreaterThanOrEqual,
    OrderedLessThan,
    OrderedLessThanOrEqual,
    OrderedNotEqual,
    Ordered,
    UnorderedOrEqual,
    UnorderedOrGreaterThan,
    UnorderedOrGreaterThanOrEqual,
    UnorderedOrLessThan,
    UnorderedOrLessThanOrEqual,
    UnorderedOrNotEqual,
    Unordered,
    True,
}

impl FloatCC {
    /// Parse an `fcmp` predicate mnemonic
    pub fn parse(text: &str) -> Option<FloatCC> {
        Some(match text {
            "false" => FloatCC::False,
            "oeq" => FloatCC::OrderedEqual,
            "ogt" => FloatCC::OrderedGreaterThan,
            "oge" => FloatCC::OrderedGreaterThanOrEqual,
            "olt" => FloatCC::OrderedLessThan,
            "ole" => FloatCC::OrderedLessThanOrEqual,
            "one" => FloatCC::OrderedNotEqual,
            "ord" => FloatCC::Ordered,
            "ueq" => FloatCC::UnorderedOrEqual,
            "ugt" => FloatCC::UnorderedOrGreaterThan,
            "uge" => FloatCC::UnorderedOrGreaterThanOrEqual,
            "ult" => FloatCC::UnorderedOrLessThan,
            "ule" => FloatCC::UnorderedOrLessThanOrEqual,
            "une" => FloatCC::UnorderedOrNotEqual,
            "uno" => FloatCC::Unordered,
            "true" => FloatCC::True,
            _ => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            FloatCC::False => "false",
            FloatCC::OrderedEqual => "oeq",
            FloatCC::OrderedGreaterThan => "ogt",
            FloatCC::OrderedGreaterThanOrEqual => "oge",
            FloatCC::OrderedLessThan => "olt",
            FloatCC::OrderedLessThanOrEqual => "ole",
            FloatCC::OrderedNotEqual => "one",
            FloatCC::Ordered => "ord",
            FloatCC::UnorderedOrEqual => "ueq",
            FloatCC::UnorderedOrGreaterThan => "ugt",
            FloatCC::UnorderedOrGreaterThanOrEqual => "uge",
            FloatCC::UnorderedOrLessThan => "ult",
            FloatCC::UnorderedOrLessThanOrEqual => "ule",
            FloatCC::UnorderedOrNotEqual => "une",
            FloatCC::Unordered => "uno",
            FloatCC::True => "true",
        }
    }

    /// C-like comparison operator, `None` for predicates without one
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            FloatCC::OrderedEqual | FloatCC::UnorderedOrEqual => Some("=="),
            FloatCC::OrderedNotEqual | FloatCC::UnorderedOrNotEqual => Some("!="),
            FloatCC::OrderedGreaterThan | FloatCC::UnorderedOrGreaterThan => Some(">"),
            FloatCC::OrderedGreaterThanOrEqual | FloatCC::UnorderedOrGreaterThanOrEqual => {
                Some(">=")
            }
            FloatCC::OrderedLessThan | FloatCC::UnorderedOrLessThan => Some("<"),
            FloatCC::OrderedLessThanOrEqual | FloatCC::UnorderedOrLessThanOrEqual => Some("<="),
            FloatCC::False | FloatCC::True | FloatCC::Ordered | FloatCC::Unordered => None,
        }
    }
}

/// Conversion operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpTrunc,
    FpExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    BitCast,
}

impl CastOp {
    pub fn parse(text: &str) -> Option<CastOp> {
        Some(match text {
            "trunc" => CastOp::Trunc,
            "zext" => CastOp::ZExt,
            "sext" => CastOp::SExt,
            "fptrunc" => CastOp::FpTrunc,
            "fpext" => CastOp::FpExt,
            "fptoui" => CastOp::FpToUi,
            "fptosi" => CastOp::FpToSi,
            "uitofp" => CastOp::UiToFp,
            "sitofp" => CastOp::SiToFp,
            "bitcast" => CastOp::BitCast,
            _ => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FpTrunc => "fptrunc",
            CastOp::FpExt => "fpext",
            CastOp::FpToUi => "fptoui",
            CastOp::FpToSi => "fptosi",
            CastOp::UiToFp => "uitofp",
            CastOp::SiToFp => "sitofp",
            CastOp::BitCast => "bitcast",
        }
    }
}

/// Operation performed by a computation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Integer arithmetic
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,

    // Floating point arithmetic
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    FNeg,

    // Comparisons
    ICmp(IntCC),
    FCmp(FloatCC),

    /// Selection: result = cond ? a : b
    Select,
    /// Conversion to the result type
    Cast(CastOp),
    /// Call of a named function or intrinsic, stored without the `@` sigil
    Call(String),
    /// Freeze of a possibly-poison value
    Freeze,
}

impl Opcode {
    /// Look up a two-operand arithmetic opcode by mnemonic
    pub fn binary(mnemonic: &str) -> Option<Opcode> {
        Some(match mnemonic {
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "udiv" => Opcode::UDiv,
            "sdiv" => Opcode::SDiv,
            "urem" => Opcode::URem,
            "srem" => Opcode::SRem,
            "shl" => Opcode::Shl,
            "lshr" => Opcode::LShr,
            "ashr" => Opcode::AShr,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "xor" => Opcode::Xor,
            "fadd" => Opcode::FAdd,
            "fsub" => Opcode::FSub,
            "fmul" => Opcode::FMul,
            "fdiv" => Opcode::FDiv,
            "frem" => Opcode::FRem,
            _ => return None,
        })
    }

    /// C-like infix operator of two-operand arithmetic
    fn infix(&self) -> Option<&'static str> {
        Some(match self {
            Opcode::Add | Opcode::FAdd => "+",
            Opcode::Sub | Opcode::FSub => "-",
            Opcode::Mul | Opcode::FMul => "*",
            Opcode::UDiv | Opcode::SDiv | Opcode::FDiv => "/",
            Opcode::URem | Opcode::SRem | Opcode::FRem => "%",
            Opcode::Shl => "<<",
            Opcode::LShr | Opcode::AShr => ">>",
            Opcode::And => "&",
            Opcode::Or => "|",
            Opcode::Xor => "^",
            Opcode::ICmp(cc) => cc.symbol(),
            Opcode::FCmp(cc) => return cc.symbol(),
            _ => return None,
        })
    }

    /// Render the operation applied to already-rendered operands.
    ///
    /// Operands dropped during propagation leave fewer operands than the
    /// opcode expects; those render in call form so nothing is silently
    /// misattributed.
    pub fn render(&self, ty: Type, operands: &[String]) -> String {
        match (self, operands) {
            (Opcode::FNeg, [a]) => format!("(-{})", a),
            (Opcode::Select, [c, t, f]) => format!("({} ? {} : {})", c, t, f),
            (Opcode::Cast(_), [a]) => format!("(({}) {})", ty, a),
            (Opcode::Freeze, [a]) => a.clone(),
            (Opcode::Call(callee), args) => format!("{}({})", callee, args.join(", ")),
            (op, [a, b]) if op.infix().is_some() => {
                format!("({} {} {})", a, op.infix().unwrap_or_default(), b)
            }
            (op, args) => format!("{}({})", op, args.join(", ")),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Add => write!(f, "add"),
            Opcode::Sub => write!(f, "sub"),
            Opcode::Mul => write!(f, "mul"),
            Opcode::UDiv => write!(f, "udiv"),
            Opcode::SDiv => write!(f, "sdiv"),
            Opcode::URem => write!(f, "urem"),
            Opcode::SRem => write!(f, "srem"),
            Opcode::Shl => write!(f, "shl"),
            Opcode::LShr => write!(f, "lshr"),
            Opcode::AShr => write!(f, "ashr"),
            Opcode::And => write!(f, "and"),
            Opcode::Or => write!(f, "or"),
            Opcode::Xor => write!(f, "xor"),
            Opcode::FAdd => write!(f, "fadd"),
            Opcode::FSub => write!(f, "fsub"),
            Opcode::FMul => write!(f, "fmul"),
            Opcode::FDiv => write!(f, "fdiv"),
            Opcode::FRem => write!(f, "frem"),
            Opcode::FNeg => write!(f, "fneg"),
            Opcode::ICmp(cc) => write!(f, "icmp {}", cc.mnemonic()),
            Opcode::FCmp(cc) => write!(f, "fcmp {}", cc.mnemonic()),
            Opcode::Select => write!(f, "select"),
            Opcode::Cast(op) => write!(f, "{}", op.mnemonic()),
            Opcode::Call(callee) => write!(f, "call @{}", callee),
            Opcode::Freeze => write!(f, "freeze"),
        }
    }
}
