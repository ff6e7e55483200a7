//! Polyhedral region model.
//!
//! This crate lifts one extracted polyhedral region (SCoP) into a typed
//! value graph:
//! - Parsers for the extraction record (SSA listings, isl sets and maps)
//! - Merge reconstruction (`phi` at a two-way join becomes a selection)
//! - Value propagation (placeholder references become producers)
//! - A verifier for the propagated region

mod entity;
mod entity_map;
mod error;
mod merge;
pub mod parser;
mod propagate;
mod region;
mod types;
mod value;
mod verifier;

pub use entity::{EntityRef, ValueId};
pub use entity_map::PrimaryMap;
pub use error::{LiftError, Result};
pub use merge::{resolve_merge, BranchContext, ResolvedMerge};
pub use parser::{ParseError, PolyExpr};
pub use propagate::{propagate, DroppedReference, PropagationReport};
pub use region::{
    record, Access, AccessRange, Dependences, DroppedStatement, ExtractionRecord, Extent, MemRef,
    MemRefKind, Parameter, Scop, Statement,
};
pub use types::Type;
pub use value::{
    expr::Expr,
    opcode::{CastOp, FloatCC, IntCC, Opcode},
    AccessKind, Validity, ValueData, ValueKind, Values,
};
pub use verifier::{verify, verify_region, VerifierError, VerifierErrorKind};
