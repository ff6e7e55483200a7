//! Extraction record schema.
//!
//! The JSON document the polyhedral extractor writes for one region. Text
//! fields hold either LLVM textual IR or isl notation and are parsed later.

use serde::Deserialize;

use crate::{parser::ParseError, value::AccessKind};

use super::MemRefKind;

/// One extracted region
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionRecord {
    pub name: String,

    /// Constraints on the parameters (`[n] -> {  : n > 0 }`)
    #[serde(default)]
    pub context: String,

    /// Union map from statement instances to schedule vectors
    #[serde(default)]
    pub schedule: String,

    #[serde(default)]
    pub parameters: Vec<ParameterRecord>,

    #[serde(default)]
    pub arrays: Vec<ArrayRecord>,

    #[serde(default)]
    pub dependencies: DependenceRecord,

    /// Every instruction of the region, newline separated
    #[serde(default)]
    pub instructions: String,

    #[serde(default)]
    pub statements: Vec<StatementRecord>,

    /// Alias groups with the access ranges of their members
    #[serde(default)]
    pub access_range: Vec<AliasGroupRecord>,
}

impl ExtractionRecord {
    /// Deserialize a record from JSON text
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(|e| ParseError {
            message: format!("Malformed extraction record at line {}: {}", e.line(), e),
            position: e.column(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterRecord {
    /// isl name of the parameter
    pub name: String,
    /// Printed SSA value the parameter stands for (`i32 %n`)
    #[serde(default)]
    pub variable: String,
    #[serde(rename = "type", default)]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayRecord {
    pub name: String,
    pub kind: MemRefKind,
    /// Extent per dimension; `*` for an unknown outermost extent
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(rename = "type", default)]
    pub ty: String,
    /// Printed base pointer
    #[serde(default)]
    pub variable: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependenceRecord {
    #[serde(rename = "RAW", default)]
    pub raw: String,
    #[serde(rename = "WAR", default)]
    pub war: String,
    #[serde(rename = "WAW", default)]
    pub waw: String,
    #[serde(rename = "RED", default)]
    pub red: String,
    #[serde(rename = "TC_RED", default)]
    pub tc_red: String,
}

/// `affine` is written either as a JSON boolean or as a string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    pub fn value(&self) -> Option<bool> {
        match self {
            Flag::Bool(b) => Some(*b),
            Flag::Text(text) => match text.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Bool(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementRecord {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub affine: Flag,
    #[serde(default)]
    pub loops: Vec<LoopRecord>,
    #[serde(default)]
    pub accesses: Vec<AccessRecord>,
    /// Listing for this statement only, replacing the region listing
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoopRecord {
    /// Printed `phi` of the induction variable; empty when the loop has none
    #[serde(default)]
    pub induction_variable: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessRecord {
    pub kind: AccessKind,
    pub relation: String,
    #[serde(default)]
    pub access_instruction: String,
    /// Printed stored value of a write
    #[serde(default)]
    pub incoming_value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasGroupRecord {
    #[serde(default)]
    pub readwrite: Vec<RangeRecord>,
    #[serde(default)]
    pub readonly: Vec<RangeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RangeRecord {
    pub minimal: String,
    pub maximal: String,
}
