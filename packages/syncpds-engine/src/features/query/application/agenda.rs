/*
 * POI Agenda
 *
 * One round:
 *   1. saturate the root solver
 *   2. create the alias sub-queries every pending POI needs
 *   3. saturate the sub-queries
 *   4. decide resolutions from sub-query allocation sites
 *   5. fire them, re-link returns if the call graph grew
 * Rounds repeat until one makes no progress.
 *
 * A POI met at origin (s, x) is resolved with sub-queries anchored at s:
 * - field POI on base b: fires for the origin when b and x share an
 *   allocation statement
 * - call-site POI on receiver r: every allocated type of r is dispatched
 *   and the target added to the call graph
 */

use super::expander::QueryExpander;
use super::sub_queries::SubQueryPool;
use crate::config::AnalysisConfig;
use crate::features::query::infrastructure::{FlowFunctions, OnTheFlyCallGraph};
use crate::features::sync_pds::{PoiKey, Resolution, SolverStatus, SyncPdsSolver};
use crate::features::weights::{Weight, WeightFunctions};
use crate::shared::models::{Method, Node};
use crate::shared::ports::ProgramModel;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::trace;

/// What every solver of one engine reads
pub(crate) struct QueryEnv<'a> {
    pub(crate) program: &'a dyn ProgramModel,
    pub(crate) call_graph: &'a OnTheFlyCallGraph,
    pub(crate) config: &'a AnalysisConfig,
    /// Flow functions of alias sub-queries
    pub(crate) backward: &'a dyn FlowFunctions,
}

/// Sub-query seeds needed by the pending POIs of `solver`
fn required_anchors<V: Weight>(solver: &SyncPdsSolver<V>) -> Vec<Node> {
    let mut out = Vec::new();
    for poi in solver.indirections() {
        let key = poi.key();
        for origin in poi.origins() {
            out.push(Node::new(origin.stmt.clone(), key.base.clone()));
            if !key.is_call_site() {
                out.push(Node::new(origin.stmt.clone(), origin.fact.clone()));
            }
        }
    }
    out
}

/// Dispatch targets of a call-site POI found so far
fn call_targets(env: &QueryEnv<'_>, pool: &SubQueryPool, key: &PoiKey, origins: &[Node]) -> BTreeSet<Method> {
    let mut targets: BTreeSet<Method> = env.call_graph.discovered(&key.location).into_iter().collect();
    let Some(method_name) = env
        .program
        .invoke_expr(&key.location)
        .map(|call| call.method_name.clone())
    else {
        return targets;
    };
    for origin in origins {
        let anchor = Node::new(origin.stmt.clone(), key.base.clone());
        let Some(sites) = pool.allocation_sites(&anchor) else {
            continue;
        };
        for site in sites {
            let type_name = env
                .program
                .statement(&site.stmt)
                .and_then(|kind| kind.allocation_type_of(&site.fact));
            if let Some(target) = type_name.and_then(|t| env.program.resolve_virtual(t, &method_name)) {
                targets.insert(target);
            }
        }
    }
    targets
}

/// Resolutions ready for the POIs of `solver`
fn decide<V: Weight>(env: &QueryEnv<'_>, pool: &SubQueryPool, solver: &SyncPdsSolver<V>) -> Vec<(PoiKey, Resolution)> {
    let mut out = Vec::new();
    for poi in solver.indirections() {
        let key = poi.key();
        if key.is_call_site() {
            let origins: Vec<Node> = poi.origins().cloned().collect();
            for target in call_targets(env, pool, key, &origins) {
                env.call_graph.add_edge(&key.location, &target);
                let resolution = Resolution::Callee(target);
                if !poi.has_fired(&resolution) {
                    out.push((key.clone(), resolution));
                }
            }
            continue;
        }
        for origin in poi.unresolved_origins() {
            let base = pool.allocation_statements(&Node::new(origin.stmt.clone(), key.base.clone()));
            let fact = pool.allocation_statements(&Node::new(origin.stmt.clone(), origin.fact.clone()));
            if let (Some(base), Some(fact)) = (base, fact) {
                if !base.is_disjoint(&fact) {
                    out.push((key.clone(), Resolution::Alias(origin)));
                }
            }
        }
    }
    out
}

/// Drive `root` and its sub-queries to a joint fixpoint or the deadline
pub(crate) fn drive<V: Weight>(
    env: &QueryEnv<'_>,
    flows: &dyn FlowFunctions,
    weights: &dyn WeightFunctions<V>,
    root: &mut SyncPdsSolver<V>,
    pool: &mut SubQueryPool,
    deadline: Option<Instant>,
) -> SolverStatus {
    let mut expander = QueryExpander::new(env.program, env.call_graph, flows, weights, env.config);
    let mut round = 0usize;
    loop {
        round += 1;
        let generation = env.call_graph.generation();
        if root.solve(&mut expander, deadline) == SolverStatus::TimedOut {
            return SolverStatus::TimedOut;
        }

        let mut progress = false;
        let mut wanted = required_anchors(root);
        for (_, solver) in pool.solvers() {
            wanted.extend(required_anchors(solver));
        }
        for anchor in wanted {
            progress |= pool.ensure(anchor);
        }
        if pool.saturate(env, deadline) == SolverStatus::TimedOut {
            return SolverStatus::TimedOut;
        }

        let root_decisions = decide(env, pool, root);
        let pool_decisions: Vec<_> = pool
            .solvers()
            .flat_map(|(owner, solver)| {
                decide(env, pool, solver)
                    .into_iter()
                    .map(move |(key, resolution)| (owner.clone(), key, resolution))
            })
            .collect();

        for (key, resolution) in root_decisions {
            progress |= root.fire_indirection(&key, resolution, &mut expander);
        }
        progress |= pool.fire(env, pool_decisions);

        if env.call_graph.generation() != generation {
            root.refresh_call_graph(&mut expander);
            pool.refresh_call_graph(env);
            progress = true;
        }

        trace!(round, sub_queries = pool.len(), progress, "agenda round");
        if !progress {
            return SolverStatus::Quiescent;
        }
    }
}
