/*
 * Query Engine
 *
 * Owns root solvers behind handles. Every root gets its own automata and
 * its own pool of alias sub-queries; roots of one engine share only the
 * program model and the on-the-fly call graph.
 *
 *   seed(query)  → handle      (validated; MalformedQuery otherwise)
 *   solve(handle)              (resumable after a timeout)
 *   solver(handle)             (results and listeners)
 *
 * `solve_backward` / `solve_forward` wrap the three steps and extract
 * results.
 */

use super::agenda::{drive, QueryEnv};
use super::sub_queries::SubQueryPool;
use crate::config::AnalysisConfig;
use crate::errors::{Result, SyncPdsError};
use crate::features::query::domain::{
    AccessPath, BackwardQuery, BackwardResults, Direction, ForwardQuery, ForwardResults, Query,
    SolverHandle,
};
use crate::features::query::infrastructure::{
    DefaultBackwardFlowFunctions, DefaultForwardFlowFunctions, FlowFunctions, OnTheFlyCallGraph,
};
use crate::features::sync_pds::{ReachableNodeListener, SolverOptions, SolverStatus, SyncPdsSolver};
use crate::features::weights::{OneWeightFunctions, Reachability, Weight, WeightFunctions};
use crate::shared::models::Node;
use crate::shared::ports::ProgramModel;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct RootQuery<W: Weight> {
    query: Query,
    solver: SyncPdsSolver<W>,
    pool: SubQueryPool,
}

pub struct QueryEngine<W: Weight> {
    program: Arc<dyn ProgramModel>,
    call_graph: Arc<OnTheFlyCallGraph>,
    config: AnalysisConfig,
    forward_flows: Arc<dyn FlowFunctions>,
    backward_flows: Arc<dyn FlowFunctions>,
    weights: Arc<dyn WeightFunctions<W>>,
    roots: BTreeMap<SolverHandle, RootQuery<W>>,
    next_handle: u32,
}

impl<W: Weight> QueryEngine<W> {
    /// Engine with default flow functions, unit weights and a private
    /// call graph
    pub fn new(program: Arc<dyn ProgramModel>, config: AnalysisConfig) -> Self {
        Self {
            program,
            call_graph: Arc::new(OnTheFlyCallGraph::new()),
            config,
            forward_flows: Arc::new(DefaultForwardFlowFunctions),
            backward_flows: Arc::new(DefaultBackwardFlowFunctions),
            weights: Arc::new(OneWeightFunctions),
            roots: BTreeMap::new(),
            next_handle: 0,
        }
    }

    pub fn with_weight_functions(mut self, weights: Arc<dyn WeightFunctions<W>>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_flow_functions(
        mut self,
        forward: Arc<dyn FlowFunctions>,
        backward: Arc<dyn FlowFunctions>,
    ) -> Self {
        self.forward_flows = forward;
        self.backward_flows = backward;
        self
    }

    pub fn with_call_graph(mut self, call_graph: Arc<OnTheFlyCallGraph>) -> Self {
        self.call_graph = call_graph;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn call_graph(&self) -> &Arc<OnTheFlyCallGraph> {
        &self.call_graph
    }

    pub fn program(&self) -> &Arc<dyn ProgramModel> {
        &self.program
    }

    fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            track_unbalanced_returns: self.config.track_unbalanced_returns,
        }
    }

    fn validate(&self, query: &Query) -> Result<()> {
        let node = query.node();
        let reject = |reason: &str| {
            warn!(query = %query, reason, "query rejected");
            Err(SyncPdsError::malformed(query, reason))
        };

        let Some(kind) = self.program.statement(&node.stmt) else {
            return reject("statement is not part of the program");
        };
        if node.fact.is_returned() {
            return reject("seed fact carries a return tag");
        }
        if !node.fact.belongs_to(&node.stmt.method) {
            return reject("fact does not belong to the statement's method");
        }
        if query.direction() == Direction::Forward && kind.allocation_type_of(&node.fact).is_none() {
            return reject("forward query must start at an allocation of its fact");
        }
        Ok(())
    }

    /// Validate and seed a new root solver
    pub fn seed(&mut self, query: impl Into<Query>) -> Result<SolverHandle> {
        let query = query.into();
        if !self.config.allow_multiple_queries && self.next_handle > 0 {
            warn!(query = %query, "second root query refused");
            return Err(SyncPdsError::MultipleQueriesDisallowed);
        }
        self.validate(&query)?;

        let handle = SolverHandle(self.next_handle);
        self.next_handle += 1;
        let options = self.solver_options();
        let solver = SyncPdsSolver::seeded(query.node().clone(), options);
        let pool = SubQueryPool::new(self.config.max_sub_queries, options);
        debug!(handle = %handle, query = %query, "root query seeded");
        self.roots.insert(
            handle,
            RootQuery {
                query,
                solver,
                pool,
            },
        );
        Ok(handle)
    }

    /// Solve with the configured budget
    pub fn solve(&mut self, handle: SolverHandle) -> Result<SolverStatus> {
        let timeout = self.config.timeout();
        self.solve_with_timeout(handle, timeout)
    }

    /// Solve with an explicit budget (`None` = unlimited)
    pub fn solve_with_timeout(
        &mut self,
        handle: SolverHandle,
        timeout: Option<Duration>,
    ) -> Result<SolverStatus> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let Self {
            program,
            call_graph,
            config,
            forward_flows,
            backward_flows,
            weights,
            roots,
            ..
        } = self;
        let root = roots
            .get_mut(&handle)
            .ok_or(SyncPdsError::UnknownSolver(handle.0))?;
        let env = QueryEnv {
            program: program.as_ref(),
            call_graph: call_graph.as_ref(),
            config,
            backward: backward_flows.as_ref(),
        };
        let flows = match root.query.direction() {
            Direction::Forward => forward_flows.as_ref(),
            Direction::Backward => backward_flows.as_ref(),
        };

        let status = drive(
            &env,
            flows,
            weights.as_ref(),
            &mut root.solver,
            &mut root.pool,
            deadline,
        );
        let stats = root.solver.stats();
        info!(
            handle = %handle,
            query = %root.query,
            status = ?status,
            nodes = stats.nodes_processed,
            sub_queries = root.pool.len(),
            "root query solved"
        );
        Ok(status)
    }

    fn root(&self, handle: SolverHandle) -> Result<&RootQuery<W>> {
        self.roots
            .get(&handle)
            .ok_or(SyncPdsError::UnknownSolver(handle.0))
    }

    pub fn query(&self, handle: SolverHandle) -> Result<&Query> {
        Ok(&self.root(handle)?.query)
    }

    pub fn solver(&self, handle: SolverHandle) -> Result<&SyncPdsSolver<W>> {
        Ok(&self.root(handle)?.solver)
    }

    /// Direct access, e.g. for registering automaton listeners
    pub fn solver_mut(&mut self, handle: SolverHandle) -> Result<&mut SyncPdsSolver<W>> {
        self.roots
            .get_mut(&handle)
            .map(|root| &mut root.solver)
            .ok_or(SyncPdsError::UnknownSolver(handle.0))
    }

    pub fn register_reachable_node_listener(
        &mut self,
        handle: SolverHandle,
        listener: Box<dyn ReachableNodeListener>,
    ) -> Result<()> {
        self.solver_mut(handle)?
            .register_reachable_node_listener(listener);
        Ok(())
    }

    pub fn unregister_all_listeners(&mut self, handle: SolverHandle) -> Result<()> {
        self.solver_mut(handle)?.unregister_all_listeners();
        Ok(())
    }

    pub fn reached_nodes(&self, handle: SolverHandle) -> Result<BTreeSet<Node>> {
        Ok(self.solver(handle)?.reached_nodes())
    }

    pub fn sub_query_count(&self, handle: SolverHandle) -> Result<usize> {
        Ok(self.root(handle)?.pool.len())
    }

    pub fn handles(&self) -> Vec<SolverHandle> {
        self.roots.keys().copied().collect()
    }

    /// Drop a root solver and its sub-queries
    pub fn discard(&mut self, handle: SolverHandle) -> Result<()> {
        self.roots
            .remove(&handle)
            .map(|_| ())
            .ok_or(SyncPdsError::UnknownSolver(handle.0))
    }

    /// Allocation sites of the query value, and its aliases at the query
    /// statement (forward passes from every allocation site found)
    pub fn solve_backward(&mut self, query: BackwardQuery) -> Result<BackwardResults> {
        let handle = self.seed(query.clone())?;
        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        let mut status = self.solve_with_timeout(handle, self.config.timeout())?;

        let options = self.solver_options();
        let Self {
            program,
            call_graph,
            config,
            forward_flows,
            backward_flows,
            roots,
            ..
        } = self;
        let root = roots
            .get_mut(&handle)
            .ok_or(SyncPdsError::UnknownSolver(handle.0))?;
        let env = QueryEnv {
            program: program.as_ref(),
            call_graph: call_graph.as_ref(),
            config,
            backward: backward_flows.as_ref(),
        };

        let allocation_sites = root.solver.allocation_sites().clone();
        let mut aliases = BTreeSet::new();
        let weights = OneWeightFunctions;
        for site in &allocation_sites {
            let mut forward = SyncPdsSolver::<Reachability>::seeded(site.clone(), options);
            let pass = drive(
                &env,
                forward_flows.as_ref(),
                &weights,
                &mut forward,
                &mut root.pool,
                deadline,
            );
            if pass == SolverStatus::TimedOut {
                status = SolverStatus::TimedOut;
            }
            for node in forward.reached_nodes() {
                if node.stmt != query.node.stmt || node.fact.is_returned() {
                    continue;
                }
                for fields in forward.field_stacks(&node) {
                    aliases.insert(AccessPath::new(node.fact.clone(), fields));
                }
            }
        }

        info!(
            query = %query.node,
            allocation_sites = allocation_sites.len(),
            aliases = aliases.len(),
            status = ?status,
            "backward query finished"
        );
        Ok(BackwardResults {
            query,
            allocation_sites,
            aliases,
            status,
            stats: root.solver.stats(),
        })
    }

    /// Reached nodes of a forward query with their weights
    pub fn solve_forward(&mut self, query: ForwardQuery) -> Result<ForwardResults<W>> {
        let handle = self.seed(query.clone())?;
        let status = self.solve(handle)?;
        let solver = self.solver(handle)?;

        let reached = solver.reached_nodes();
        let weights = reached
            .iter()
            .map(|node| (node.clone(), solver.node_weight(node)))
            .collect();
        let top_level = reached
            .iter()
            .filter(|node| solver.is_top_level(node))
            .cloned()
            .collect();

        Ok(ForwardResults {
            query,
            reached,
            weights,
            top_level,
            status,
            stats: solver.stats(),
        })
    }
}

impl<W: Weight> std::fmt::Debug for QueryEngine<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("config", &self.config)
            .field("call_graph", &self.call_graph)
            .field("roots", &self.roots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::query::infrastructure::{InMemoryProgram, MethodBuilder};
    use crate::shared::models::{Method, Statement, Val};

    fn straight_line() -> (Arc<dyn ProgramModel>, Method) {
        let main = Method::new("Main", "main");
        let mut b = MethodBuilder::new(main.clone());
        b.alloc("a", "A");
        b.copy("b", "a");
        b.ret(None);
        let mut program = InMemoryProgram::new();
        program.add_method(b);
        (Arc::new(program), main)
    }

    #[test]
    fn test_rejects_unknown_statement() {
        let (program, main) = straight_line();
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, AnalysisConfig::default());
        let query = BackwardQuery::new(Statement::new(main.clone(), 99), Val::local("a", &main));

        assert!(matches!(
            engine.seed(query),
            Err(SyncPdsError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn test_rejects_foreign_fact() {
        let (program, main) = straight_line();
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, AnalysisConfig::default());
        let other = Method::new("Other", "run");
        let query = BackwardQuery::new(Statement::new(main, 2), Val::local("a", &other));

        assert!(matches!(
            engine.seed(query),
            Err(SyncPdsError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn test_forward_query_must_start_at_allocation() {
        let (program, main) = straight_line();
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, AnalysisConfig::default());
        let query = ForwardQuery::new(Statement::new(main.clone(), 2), Val::local("b", &main));

        assert!(matches!(
            engine.seed(query),
            Err(SyncPdsError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn test_single_query_mode() {
        let (program, main) = straight_line();
        let config = AnalysisConfig::default().allow_multiple_queries(false);
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, config);
        let query = BackwardQuery::new(Statement::new(main.clone(), 2), Val::local("b", &main));

        assert!(engine.seed(query.clone()).is_ok());
        assert!(matches!(
            engine.seed(query),
            Err(SyncPdsError::MultipleQueriesDisallowed)
        ));
    }

    #[test]
    fn test_unknown_handle() {
        let (program, _) = straight_line();
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, AnalysisConfig::default());

        assert!(matches!(
            engine.solve(SolverHandle(7)),
            Err(SyncPdsError::UnknownSolver(7))
        ));
    }

    #[test]
    fn test_backward_copy_finds_allocation_and_aliases() {
        let (program, main) = straight_line();
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, AnalysisConfig::default());
        let query = BackwardQuery::new(Statement::new(main.clone(), 2), Val::local("b", &main));

        let results = engine.solve_backward(query).unwrap();
        assert!(results.is_complete());
        assert_eq!(
            results.allocation_statements(),
            BTreeSet::from([Statement::new(main.clone(), 1)])
        );
        assert!(results.may_alias(&AccessPath::local(Val::local("a", &main))));
        assert!(results.may_alias(&AccessPath::local(Val::local("b", &main))));
    }

    #[test]
    fn test_discard_then_reuse_handle_fails() {
        let (program, main) = straight_line();
        let mut engine: QueryEngine<Reachability> = QueryEngine::new(program, AnalysisConfig::default());
        let handle = engine
            .seed(BackwardQuery::new(Statement::new(main.clone(), 2), Val::local("b", &main)))
            .unwrap();

        engine.discard(handle).unwrap();
        assert!(engine.reached_nodes(handle).is_err());
        assert!(engine.handles().is_empty());
    }
}
