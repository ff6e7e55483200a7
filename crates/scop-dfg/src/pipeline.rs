//! Lift pipeline: record → region → graph.

use scop_ir::{
    propagate, verify_region, ExtractionRecord, LiftError, PropagationReport, Result, Scop,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    backend::{Backend, RegionMetadata},
    generator::generate,
    graph::DataflowGraph,
    roundtrip::check_roundtrip,
};

/// Lift options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LiftOptions {
    /// Fail on references nothing in the region defines instead of
    /// dropping them
    pub strict_references: bool,
    /// Reject regions without any iteration construct
    pub prune_unprofitable: bool,
    /// Check the generated graph against the region
    pub roundtrip: bool,
}

impl Default for LiftOptions {
    fn default() -> Self {
        Self {
            strict_references: false,
            prune_unprofitable: true,
            roundtrip: true,
        }
    }
}

/// A successfully lifted region
#[derive(Debug, Clone)]
pub struct Lifted {
    pub scop: Scop,
    pub report: PropagationReport,
    pub graph: DataflowGraph,
    pub metadata: RegionMetadata,
}

/// Build, propagate and verify a region without generating a graph
#[instrument(skip_all, fields(region = %record.name))]
pub fn resolve(record: &ExtractionRecord, options: &LiftOptions) -> Result<(Scop, PropagationReport)> {
    let mut scop = Scop::from_record(record)?;
    let report = propagate(&mut scop);
    if options.strict_references {
        if let Some(dropped) = report.dropped.first() {
            return Err(LiftError::UnresolvedValue {
                reference: dropped.reference.clone(),
                message: format!("no producer in the region (used by {})", dropped.owner),
            });
        }
    }
    verify_region(&scop)?;
    Ok((scop, report))
}

/// Lift one region from its extraction record
#[instrument(skip_all, fields(region = %record.name))]
pub fn lift_record(record: &ExtractionRecord, options: &LiftOptions) -> Result<Lifted> {
    let (scop, report) = resolve(record, options)?;

    if options.prune_unprofitable && !scop.has_loops() {
        info!("pruning region without iteration");
        return Err(LiftError::Unprofitable(scop.name.clone()));
    }

    let graph = generate(&scop)?;
    if options.roundtrip {
        check_roundtrip(&scop, &graph)?;
    } else {
        warn!("round-trip check disabled");
    }

    let metadata = RegionMetadata::from_scop(&scop);
    info!(
        statements = scop.statements.len(),
        dropped = scop.dropped.len(),
        nodes = graph.nodes.len(),
        "lifted region"
    );
    Ok(Lifted {
        scop,
        report,
        graph,
        metadata,
    })
}

/// Lift one region from the JSON text of its extraction record
pub fn lift(record_json: &str, options: &LiftOptions) -> Result<Lifted> {
    let record = ExtractionRecord::from_json(record_json)?;
    lift_record(&record, options)
}

/// Lift a region and hand the graph to a backend
pub fn lift_with<B: Backend>(
    record_json: &str,
    options: &LiftOptions,
    backend: &mut B,
) -> Result<B::Artifact> {
    let lifted = lift(record_json, options)?;
    backend
        .materialize(&lifted.graph, &lifted.metadata)
        .map_err(|e| LiftError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options: LiftOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, LiftOptions::default());
        assert!(options.prune_unprofitable && options.roundtrip);
        assert!(!options.strict_references);

        let options: LiftOptions =
            serde_json::from_str(r#"{ "strict_references": true }"#).unwrap();
        assert!(options.strict_references);
        assert!(options.roundtrip);
    }

    const STRAIGHT_LINE: &str = r#"{
        "name": "straight",
        "arrays": [{ "name": "A", "kind": "array", "sizes": ["4"], "type": "i32" }],
        "statements": [{
            "name": "S",
            "domain": "{ S[] }",
            "accesses": [{
                "kind": "write", "relation": "{ S[] -> A[0] }",
                "access_instruction": "store i32 7, ptr %A"
            }]
        }]
    }"#;

    #[test]
    fn test_region_without_loops_is_pruned() {
        let err = lift(STRAIGHT_LINE, &LiftOptions::default()).unwrap_err();
        assert_eq!(err.category(), "Unprofitable");

        let options = LiftOptions {
            prune_unprofitable: false,
            ..LiftOptions::default()
        };
        let lifted = lift(STRAIGHT_LINE, &options).unwrap();
        assert_eq!(lifted.graph.scopes.len(), 1);
        assert!(lifted.graph.scopes[0].ranges.is_empty());
    }

    #[test]
    fn test_strict_references() {
        let json = r#"{
            "name": "strict",
            "arrays": [{ "name": "A", "kind": "array", "sizes": ["*"], "type": "i64" }],
            "instructions": "  %v = add i64 %outside, 1",
            "statements": [{
                "name": "S",
                "domain": "{ S[i0] : 0 <= i0 <= 3 }",
                "loops": [{ "induction_variable": "%i = phi i64 [ 0, %e ], [ %i.n, %b ]" }],
                "accesses": [{
                    "kind": "write", "relation": "{ S[i0] -> A[i0] }",
                    "access_instruction": "store i64 %v, ptr %p",
                    "incoming_value": "  %v = add i64 %outside, 1"
                }]
            }]
        }"#;

        // Lenient: the dangling operand is dropped and reported
        let lifted = lift(json, &LiftOptions::default()).unwrap();
        assert_eq!(lifted.report.dropped.len(), 1);
        assert_eq!(lifted.report.dropped[0].reference, "%outside");

        let options = LiftOptions {
            strict_references: true,
            ..LiftOptions::default()
        };
        match lift(json, &options) {
            Err(LiftError::UnresolvedValue { reference, .. }) => assert_eq!(reference, "%outside"),
            other => panic!("Expected UnresolvedValue, got {:?}", other.map(|l| l.scop.name)),
        }
    }
}
