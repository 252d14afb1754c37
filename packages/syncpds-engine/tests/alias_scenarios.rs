//! End-to-end alias queries over small programs

mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use syncpds_engine::config::{AnalysisConfig, Preset};
use syncpds_engine::features::query::{
    AccessPath, DefaultBackwardFlowFunctions, DefaultForwardFlowFunctions, FactFlow,
    FlowFunctions, Direction,
};
use syncpds_engine::{
    BackwardQuery, ForwardQuery, Method, Node, ProgramModel, QueryEngine, Reachability,
    SolverStatus, Statement, SyncPdsError, Val,
};

fn engine(program: syncpds_engine::InMemoryProgram, config: AnalysisConfig) -> QueryEngine<Reachability> {
    QueryEngine::new(shared(program), config)
}

// ============================================================================
// Backward queries
// ============================================================================

#[test]
fn test_copy_aliases_share_allocation() {
    let main = main_method();
    let mut engine = engine(copy_program(), AnalysisConfig::default());

    let results = engine
        .solve_backward(BackwardQuery::new(stmt(&main, 2), local(&main, "b")))
        .unwrap();

    assert_eq!(results.status, SolverStatus::Quiescent);
    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));
    assert!(results.may_alias(&AccessPath::local(local(&main, "a"))));
}

#[test]
fn test_identity_call_returns_argument() {
    let main = main_method();
    let mut engine = engine(identity_call_program(), AnalysisConfig::default());

    let results = engine
        .solve_backward(BackwardQuery::new(stmt(&main, 3), local(&main, "b")))
        .unwrap();

    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));
    let aliases: BTreeSet<String> = results.aliases.iter().map(|p| p.to_string()).collect();
    assert!(aliases.contains(&AccessPath::local(local(&main, "a")).to_string()));
    assert!(aliases.contains(&AccessPath::local(local(&main, "b")).to_string()));
}

#[test]
fn test_field_written_in_callee() {
    let main = main_method();
    let mut engine = engine(field_across_call_program(), AnalysisConfig::default());

    let results = engine
        .solve_backward(BackwardQuery::new(stmt(&main, 4), local(&main, "x")))
        .unwrap();

    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));
    assert!(results.may_alias(&AccessPath::new(
        local(&main, "o"),
        vec![syncpds_engine::Field::named("f")]
    )));
}

#[test]
fn test_field_alias_through_copy_needs_field_pois() {
    let main = main_method();
    let query = BackwardQuery::new(stmt(&main, 5), local(&main, "x"));

    let mut precise = engine(field_alias_program(), AnalysisConfig::preset(Preset::Balanced));
    let results = precise.solve_backward(query.clone()).unwrap();
    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));

    let config = AnalysisConfig::preset(Preset::Balanced).resolve_field_aliases(false);
    let mut blind = engine(field_alias_program(), config);
    let results = blind.solve_backward(query).unwrap();
    assert!(results.allocation_sites.is_empty());
}

#[test]
fn test_self_referential_field_terminates() {
    let main = main_method();
    let config = AnalysisConfig::default().timeout_ms(5_000);
    let mut engine = engine(self_referential_program(), config);

    let results = engine
        .solve_backward(BackwardQuery::new(stmt(&main, 3), local(&main, "y")))
        .unwrap();

    assert!(results.is_complete());
    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));
    assert!(results.may_alias(&AccessPath::local(local(&main, "y"))));
}

// ============================================================================
// On-the-fly call graph
// ============================================================================

#[test]
fn test_virtual_call_resolved_on_the_fly() {
    let main = main_method();
    let mut engine = engine(virtual_call_program(), AnalysisConfig::default());

    let results = engine
        .solve_backward(BackwardQuery::new(stmt(&main, 4), local(&main, "b")))
        .unwrap();

    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));
    assert_eq!(
        engine.call_graph().discovered(&stmt(&main, 3)),
        vec![Method::new("Box", "id")]
    );
}

#[test]
fn test_virtual_call_opaque_without_on_the_fly() {
    let main = main_method();
    let config = AnalysisConfig::default().on_the_fly_call_graph(false);
    let mut engine = engine(virtual_call_program(), config);

    let results = engine
        .solve_backward(BackwardQuery::new(stmt(&main, 4), local(&main, "b")))
        .unwrap();

    assert!(results.allocation_sites.is_empty());
    assert_eq!(engine.call_graph().edge_count(), 0);
}

#[test]
fn test_shared_call_graph_reused_by_next_engine() {
    let main = main_method();
    let ctx = context(virtual_call_program(), AnalysisConfig::default());

    let mut first: QueryEngine<Reachability> = ctx.engine();
    first
        .solve_backward(BackwardQuery::new(stmt(&main, 4), local(&main, "b")))
        .unwrap();
    let generation = ctx.call_graph().generation();
    assert!(generation > 0);

    let mut second: QueryEngine<Reachability> = ctx.engine();
    let results = second
        .solve_backward(BackwardQuery::new(stmt(&main, 4), local(&main, "b")))
        .unwrap();
    assert_eq!(results.allocation_statements(), BTreeSet::from([stmt(&main, 1)]));
    assert_eq!(ctx.call_graph().generation(), generation);
}

// ============================================================================
// Custom flow functions
// ============================================================================

/// Forward flows that end every fact at `System.exit`
struct TruncatingExit(DefaultForwardFlowFunctions);

impl FlowFunctions for TruncatingExit {
    fn direction(&self) -> Direction {
        self.0.direction()
    }

    fn normal_flow(&self, program: &dyn ProgramModel, fact: &Val, stmt: &Statement) -> Vec<FactFlow> {
        self.0.normal_flow(program, fact, stmt)
    }

    fn call_flow(&self, program: &dyn ProgramModel, fact: &Val, call_site: &Statement, callee: &Method) -> Vec<Node> {
        self.0.call_flow(program, fact, call_site, callee)
    }

    fn call_to_return_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callees: &[Method],
    ) -> Vec<FactFlow> {
        let is_exit = program
            .invoke_expr(call_site)
            .is_some_and(|call| call.method_name == "exit");
        if is_exit {
            return Vec::new();
        }
        self.0.call_to_return_flow(program, fact, call_site, callees)
    }

    fn return_flow(&self, program: &dyn ProgramModel, exit: &Node) -> Vec<Val> {
        self.0.return_flow(program, exit)
    }

    fn map_returned(&self, program: &dyn ProgramModel, returned: &Val, call_site: &Statement) -> Vec<Val> {
        self.0.map_returned(program, returned, call_site)
    }
}

#[test]
fn test_custom_flow_functions_truncate_exit() {
    let main = main_method();
    let query = ForwardQuery::new(stmt(&main, 1), local(&main, "a"));
    let after_copy = Node::new(stmt(&main, 3), local(&main, "b"));

    let mut default = engine(exit_program(), AnalysisConfig::default());
    let results = default.solve_forward(query.clone()).unwrap();
    assert!(results.reached.contains(&after_copy));

    let mut truncating = engine(exit_program(), AnalysisConfig::default()).with_flow_functions(
        Arc::new(TruncatingExit(DefaultForwardFlowFunctions)),
        Arc::new(DefaultBackwardFlowFunctions),
    );
    let results = truncating.solve_forward(query).unwrap();
    assert!(!results.reached.contains(&after_copy));
    assert_eq!(results.reached_at(&stmt(&main, 3)).count(), 0);
}

// ============================================================================
// Forward queries
// ============================================================================

#[test]
fn test_forward_reaches_through_call() {
    let main = main_method();
    let mut engine = engine(identity_call_program(), AnalysisConfig::default());

    let results = engine
        .solve_forward(ForwardQuery::new(stmt(&main, 1), local(&main, "a")))
        .unwrap();

    let at_nop: BTreeSet<&Val> = results.reached_at(&stmt(&main, 3)).map(|n| &n.fact).collect();
    assert_eq!(at_nop, BTreeSet::from([&local(&main, "a"), &local(&main, "b")]));
    assert!(results.top_level.contains(&Node::new(stmt(&main, 3), local(&main, "b"))));
    let callee_entry = Node::new(stmt(&Method::new("Main", "id"), 0), Val::local("p", &Method::new("Main", "id")));
    assert!(results.reached.contains(&callee_entry));
    assert!(!results.top_level.contains(&callee_entry));
}

// ============================================================================
// Engine contract
// ============================================================================

#[test]
fn test_results_are_deterministic() {
    let main = main_method();
    let query = BackwardQuery::new(stmt(&main, 5), local(&main, "x"));

    let first = engine(field_alias_program(), AnalysisConfig::default())
        .solve_backward(query.clone())
        .unwrap();
    let second = engine(field_alias_program(), AnalysisConfig::default())
        .solve_backward(query)
        .unwrap();

    assert_eq!(first.allocation_sites, second.allocation_sites);
    assert_eq!(first.aliases, second.aliases);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_timeout_then_resume() {
    let main = main_method();
    let mut engine = engine(identity_call_program(), AnalysisConfig::default());
    let handle = engine
        .seed(BackwardQuery::new(stmt(&main, 3), local(&main, "b")))
        .unwrap();

    let status = engine.solve_with_timeout(handle, Some(Duration::ZERO)).unwrap();
    assert_eq!(status, SolverStatus::TimedOut);

    let status = engine.solve_with_timeout(handle, None).unwrap();
    assert_eq!(status, SolverStatus::Quiescent);
    let sites: BTreeSet<Statement> = engine
        .solver(handle)
        .unwrap()
        .allocation_sites()
        .iter()
        .map(|n| n.stmt.clone())
        .collect();
    assert_eq!(sites, BTreeSet::from([stmt(&main, 1)]));
}

#[test]
fn test_reachable_node_listener_sees_replayed_nodes() {
    let main = main_method();
    let mut engine = engine(copy_program(), AnalysisConfig::default());
    let handle = engine
        .seed(BackwardQuery::new(stmt(&main, 2), local(&main, "b")))
        .unwrap();
    engine.solve(handle).unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    engine
        .register_reachable_node_listener(handle, Box::new(move |node: &Node| sink.lock().push(node.clone())))
        .unwrap();

    let reached = engine.reached_nodes(handle).unwrap();
    let seen: BTreeSet<Node> = seen.lock().iter().cloned().collect();
    assert_eq!(seen, reached);
}

#[test]
fn test_malformed_queries_rejected() {
    let main = main_method();
    let mut engine = engine(copy_program(), AnalysisConfig::default());

    let unknown = BackwardQuery::new(stmt(&main, 17), local(&main, "b"));
    assert!(matches!(engine.seed(unknown), Err(SyncPdsError::MalformedQuery { .. })));

    let returned = BackwardQuery::new(stmt(&main, 2), local(&main, "b").returned());
    assert!(matches!(engine.seed(returned), Err(SyncPdsError::MalformedQuery { .. })));

    let not_alloc = ForwardQuery::new(stmt(&main, 2), local(&main, "b"));
    assert!(matches!(engine.seed(not_alloc), Err(SyncPdsError::MalformedQuery { .. })));
    assert!(engine.handles().is_empty());
}

#[test]
fn test_single_query_engine() {
    let main = main_method();
    let mut engine = engine(copy_program(), AnalysisConfig::preset(Preset::Fast));
    let query = BackwardQuery::new(stmt(&main, 2), local(&main, "b"));

    engine.solve_backward(query.clone()).unwrap();
    assert!(matches!(
        engine.solve_backward(query),
        Err(SyncPdsError::MultipleQueriesDisallowed)
    ));
}
