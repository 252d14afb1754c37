use super::agenda::QueryEnv;
use super::expander::QueryExpander;
use crate::features::sync_pds::{PoiKey, Resolution, SolverOptions, SolverStatus, SyncPdsSolver};
use crate::features::weights::{OneWeightFunctions, Reachability};
use crate::shared::models::{Node, Statement};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, warn};

/// Backward alias sub-queries owned by one root query
///
/// Keyed by seed node; a sub-query is created at most once and kept for
/// the lifetime of its root, so later POIs reuse its allocation sites.
pub(crate) struct SubQueryPool {
    solvers: BTreeMap<Node, SyncPdsSolver<Reachability>>,
    limit: usize,
    options: SolverOptions,
    refused: BTreeSet<Node>,
}

impl SubQueryPool {
    pub(crate) fn new(limit: usize, options: SolverOptions) -> Self {
        Self {
            solvers: BTreeMap::new(),
            limit,
            options,
            refused: BTreeSet::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.solvers.len()
    }

    /// Create the sub-query seeded at `seed`; true when newly created
    pub(crate) fn ensure(&mut self, seed: Node) -> bool {
        if self.solvers.contains_key(&seed) || self.refused.contains(&seed) {
            return false;
        }
        if self.solvers.len() >= self.limit {
            warn!(seed = %seed, limit = self.limit, "sub-query budget exhausted");
            self.refused.insert(seed);
            return false;
        }
        debug!(seed = %seed, "alias sub-query created");
        self.solvers
            .insert(seed.clone(), SyncPdsSolver::seeded(seed, self.options));
        true
    }

    pub(crate) fn solvers(&self) -> impl Iterator<Item = (&Node, &SyncPdsSolver<Reachability>)> {
        self.solvers.iter()
    }

    /// Allocation statements found so far, `None` when no such sub-query
    pub(crate) fn allocation_statements(&self, seed: &Node) -> Option<BTreeSet<Statement>> {
        self.solvers.get(seed).map(|solver| {
            solver
                .allocation_sites()
                .iter()
                .map(|n| n.stmt.clone())
                .collect()
        })
    }

    pub(crate) fn allocation_sites(&self, seed: &Node) -> Option<&BTreeSet<Node>> {
        self.solvers.get(seed).map(|solver| solver.allocation_sites())
    }

    /// Run every sub-query with pending work
    pub(crate) fn saturate(&mut self, env: &QueryEnv<'_>, deadline: Option<Instant>) -> SolverStatus {
        let weights = OneWeightFunctions;
        let mut expander =
            QueryExpander::new(env.program, env.call_graph, env.backward, &weights, env.config);
        for solver in self.solvers.values_mut() {
            if solver.is_saturated() {
                continue;
            }
            if solver.solve(&mut expander, deadline) == SolverStatus::TimedOut {
                return SolverStatus::TimedOut;
            }
        }
        SolverStatus::Quiescent
    }

    /// Deliver decisions to their owning sub-queries; true on any change
    pub(crate) fn fire(&mut self, env: &QueryEnv<'_>, decisions: Vec<(Node, PoiKey, Resolution)>) -> bool {
        let weights = OneWeightFunctions;
        let mut expander =
            QueryExpander::new(env.program, env.call_graph, env.backward, &weights, env.config);
        let mut changed = false;
        for (owner, key, resolution) in decisions {
            if let Some(solver) = self.solvers.get_mut(&owner) {
                changed |= solver.fire_indirection(&key, resolution, &mut expander);
            }
        }
        changed
    }

    pub(crate) fn refresh_call_graph(&mut self, env: &QueryEnv<'_>) {
        let weights = OneWeightFunctions;
        let mut expander =
            QueryExpander::new(env.program, env.call_graph, env.backward, &weights, env.config);
        for solver in self.solvers.values_mut() {
            solver.refresh_call_graph(&mut expander);
        }
    }
}
