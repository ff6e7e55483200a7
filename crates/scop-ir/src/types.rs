//! Scalar types of lifted values.

use std::fmt;

/// A scalar type in the lifted region.
///
/// The extraction record spells types the way the SSA listing does
/// (`i1`, `i64`, `float`, `double`); [`Type::parse`] maps them onto this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 1-bit boolean (`i1`)
    Bool,
    /// Integer of the given bit width
    Int(u32),
    /// Floating point of the given bit width
    Float(u32),
}

impl Type {
    /// Parse a type spelling from the SSA listing.
    pub fn parse(text: &str) -> Option<Type> {
        match text.trim() {
            "i1" => Some(Type::Bool),
            "half" | "bfloat" => Some(Type::Float(16)),
            "float" => Some(Type::Float(32)),
            "double" => Some(Type::Float(64)),
            "x86_fp80" => Some(Type::Float(80)),
            "fp128" | "ppc_fp128" => Some(Type::Float(128)),
            other => {
                let width = other.strip_prefix('i')?;
                if width.is_empty() || !width.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                width.parse().ok().map(Type::Int)
            }
        }
    }

    /// Get the size of this type in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Type::Bool => 1,
            Type::Int(w) | Type::Float(w) => *w,
        }
    }

    /// Check if this is an integer type (booleans included).
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Bool | Type::Int(_))
    }

    /// Check if this is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "i1"),
            Type::Int(w) => write!(f, "i{}", w),
            Type::Float(16) => write!(f, "half"),
            Type::Float(32) => write!(f, "float"),
            Type::Float(64) => write!(f, "double"),
            Type::Float(80) => write!(f, "x86_fp80"),
            Type::Float(128) => write!(f, "fp128"),
            Type::Float(w) => write!(f, "f{}", w),
        }
    }
}
