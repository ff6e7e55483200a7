//! Whole-pipeline tests against recorded regions.

use scop_dfg::{lift, lift_with, Backend, DataflowGraph, LiftOptions, NodeKind, RegionMetadata};
use scop_ir::{Expr, LiftError};
use thiserror::Error;

const NONAFFINE: &str = include_str!("../../scop-ir/tests/data/nonaffine_branch.json");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_two_statement_region() {
    init_tracing();
    let lifted = lift(NONAFFINE, &LiftOptions::default()).unwrap();
    let graph = &lifted.graph;

    assert_eq!(
        graph.arrays.keys().collect::<Vec<_>>(),
        vec!["MemRef0", "MemRef1", "MemRef3"]
    );
    let order: Vec<_> = graph.scopes.iter().map(|s| s.statement.as_str()).collect();
    assert_eq!(order, vec!["Stmt0", "Stmt1"]);
    for scope in &graph.scopes {
        assert_eq!(scope.ranges.len(), 1);
        assert_eq!(scope.ranges[0].lower, "0");
        assert_eq!(scope.ranges[0].upper, "255");
        assert!(scope.conditions.is_empty());
    }
    assert!(lifted.report.dropped.is_empty());
}

#[test]
fn test_selection_reaches_stored_array() {
    let lifted = lift(NONAFFINE, &LiftOptions::default()).unwrap();
    let graph = &lifted.graph;

    let (_, write) = graph
        .writes()
        .find(|(scope, id)| {
            scope.statement == "Stmt0"
                && matches!(&graph.nodes[*id].kind, NodeKind::Write { array, .. } if array == "MemRef3")
        })
        .unwrap();
    let select = graph.inputs(write)[0];
    assert_eq!(graph.nodes[select].kind, NodeKind::Select);

    let inputs = graph.inputs(select);
    assert!(matches!(graph.nodes[inputs[0]].kind, NodeKind::Compute { .. }));
    assert!(matches!(
        &graph.nodes[inputs[2]].kind,
        NodeKind::Read { array, reference, .. } if array == "MemRef1" && reference == "%.pre"
    ));
}

#[test]
fn test_cross_statement_value_is_recomputed() {
    let lifted = lift(NONAFFINE, &LiftOptions::default()).unwrap();
    let graph = &lifted.graph;
    let (_, write) = graph.writes().find(|(s, _)| s.statement == "Stmt1").unwrap();
    match graph.expr(write).unwrap() {
        Expr::Op { operands, .. } => assert!(matches!(*operands[0], Expr::Select { .. })),
        other => panic!("Expected operation, got {}", other),
    }
}

#[test]
fn test_undefined_merge_fails_region() {
    let json = NONAFFINE.replace("[ %.pre, %for.body11", "[ undef, %for.body11");
    let err = lift(&json, &LiftOptions::default()).unwrap_err();
    assert!(matches!(err, LiftError::UnrepresentableMerge { .. }));
}

#[derive(Debug, Error)]
#[error("backend rejected {0}")]
struct Rejected(String);

#[derive(Default)]
struct Recorder {
    seen: Vec<String>,
    reject: bool,
}

impl Backend for Recorder {
    type Artifact = usize;
    type Error = Rejected;

    fn materialize(
        &mut self,
        graph: &DataflowGraph,
        metadata: &RegionMetadata,
    ) -> Result<usize, Rejected> {
        if self.reject {
            return Err(Rejected(metadata.name.clone()));
        }
        self.seen.push(graph.name.clone());
        Ok(graph.nodes.len())
    }
}

#[test]
fn test_backend_receives_graph() {
    let mut backend = Recorder::default();
    let nodes = lift_with(NONAFFINE, &LiftOptions::default(), &mut backend).unwrap();
    assert!(nodes > 0);
    assert_eq!(backend.seen, vec!["%for.body11---%for.body33"]);

    let mut backend = Recorder {
        reject: true,
        ..Recorder::default()
    };
    let err = lift_with(NONAFFINE, &LiftOptions::default(), &mut backend).unwrap_err();
    assert_eq!(err.category(), "Backend");
    assert_eq!(
        err.to_string(),
        "backend failure: backend rejected %for.body11---%for.body33"
    );
}
