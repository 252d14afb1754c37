/*
 * On-the-Fly Call Graph
 *
 * Static targets come from the ProgramModel; edges discovered while
 * resolving call-site POIs are appended here. The graph only grows, so
 * it can be shared between engines on different threads: readers see a
 * prefix of the final edge set, and `generation` tells them when to
 * re-read.
 */

use crate::shared::models::{Method, Statement};
use crate::shared::ports::ProgramModel;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type CallerIndex = FxHashMap<Method, BTreeSet<Statement>>;

#[derive(Default)]
pub struct OnTheFlyCallGraph {
    /// call site → discovered targets
    edges: DashMap<Statement, BTreeSet<Method>>,
    /// target → call sites that discovered it
    callers: DashMap<Method, BTreeSet<Statement>>,
    generation: AtomicU64,
    /// callers from static targets, built on first use
    static_callers: RwLock<Option<Arc<CallerIndex>>>,
}

impl OnTheFlyCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static targets plus discovered ones, sorted
    pub fn callees(&self, program: &dyn ProgramModel, call_site: &Statement) -> Vec<Method> {
        let mut out: BTreeSet<Method> = program.call_targets(call_site).into_iter().collect();
        if let Some(found) = self.edges.get(call_site) {
            out.extend(found.iter().cloned());
        }
        out.into_iter().collect()
    }

    /// Discovered targets only
    pub fn discovered(&self, call_site: &Statement) -> Vec<Method> {
        self.edges
            .get(call_site)
            .map(|found| found.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record an edge; false when already known
    pub fn add_edge(&self, call_site: &Statement, target: &Method) -> bool {
        let is_new = self
            .edges
            .entry(call_site.clone())
            .or_default()
            .insert(target.clone());
        if is_new {
            self.callers
                .entry(target.clone())
                .or_default()
                .insert(call_site.clone());
            self.generation.fetch_add(1, Ordering::AcqRel);
            debug!(call_site = %call_site, target = %target, "call graph edge discovered");
        }
        is_new
    }

    /// Call sites that may invoke `method`, sorted
    pub fn callers_of(&self, program: &dyn ProgramModel, method: &Method) -> Vec<Statement> {
        let index = self.static_index(program);
        let mut out: BTreeSet<Statement> = index.get(method).cloned().unwrap_or_default();
        if let Some(found) = self.callers.get(method) {
            out.extend(found.iter().cloned());
        }
        out.into_iter().collect()
    }

    /// Bumped on every new edge
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(|entry| entry.value().len()).sum()
    }

    fn static_index(&self, program: &dyn ProgramModel) -> Arc<CallerIndex> {
        if let Some(index) = self.static_callers.read().as_ref() {
            return Arc::clone(index);
        }
        let mut guard = self.static_callers.write();
        if let Some(index) = guard.as_ref() {
            return Arc::clone(index);
        }
        let mut index = CallerIndex::default();
        for method in program.methods() {
            for stmt in program.statements(&method) {
                for target in program.call_targets(&stmt) {
                    index.entry(target).or_default().insert(stmt.clone());
                }
            }
        }
        let index = Arc::new(index);
        *guard = Some(Arc::clone(&index));
        index
    }
}

impl std::fmt::Debug for OnTheFlyCallGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnTheFlyCallGraph")
            .field("edges", &self.edge_count())
            .field("generation", &self.generation())
            .finish()
    }
}
