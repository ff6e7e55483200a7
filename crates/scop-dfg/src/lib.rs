//! Dataflow graph generation for lifted regions.
//!
//! - [`generate`] turns a verified [`scop_ir::Scop`] into a [`DataflowGraph`]
//! - [`check_roundtrip`] proves the graph computes what the region computes
//! - [`lift`] runs the whole pipeline from an extraction record
//! - [`Backend`] is the seam to whatever consumes the graph

mod backend;
mod generator;
mod graph;
mod pipeline;
mod roundtrip;
mod schedule;

pub use backend::{Backend, RegionMetadata};
pub use generator::generate;
pub use graph::{ArrayDecl, DataflowGraph, IterationScope, Node, NodeId, NodeKind, Range};
pub use pipeline::{lift, lift_record, lift_with, resolve, LiftOptions, Lifted};
pub use roundtrip::check_roundtrip;
pub use schedule::{schedule_vector, statement_order, Component};
