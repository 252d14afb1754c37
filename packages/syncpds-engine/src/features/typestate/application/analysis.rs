/*
 * Typestate Analysis
 *
 * One forward query per allocation of the tracked type, weighted by the
 * protocol's transition functions. At every method end point the states
 * of the reached facts decide:
 *
 * - some fact in the error state       → InvalidTransition
 * - no fact in a final-only state set  → MaybeLeaked / ResourceLeak
 *
 * End points where the object escapes (returned, held by a parameter, a
 * static or a field) are not judged; the caller or the heap owns it.
 *
 * # Example
 * ```rust,ignore
 * let analysis = TypestateAnalysis::new(FileProtocol::define(), "File");
 * let report = analysis.run(&context)?;
 * for violation in &report.violations {
 *     println!("{}", violation);
 * }
 * ```
 */

use crate::errors::Result;
use crate::features::query::{AnalysisContext, AnalysisScope, ForwardQuery, Query};
use crate::features::sync_pds::{SolverStatus, SyncPdsSolver};
use crate::features::typestate::domain::{
    Protocol, ProtocolViolation, State, TransitionFunction, ViolationKind,
};
use crate::features::typestate::infrastructure::TypestateWeightFunctions;
use crate::shared::models::{Node, Statement, StatementKind};
use crate::shared::ports::ProgramModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Notified for every violation as soon as it is found
pub trait WitnessListener {
    fn witness_found(&mut self, violation: &ProtocolViolation);
}

impl<F> WitnessListener for F
where
    F: FnMut(&ProtocolViolation),
{
    fn witness_found(&mut self, violation: &ProtocolViolation) {
        self(violation)
    }
}

/// States of one tracked allocation at the end points it reaches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub allocation: Node,
    pub end_states: BTreeMap<Node, BTreeSet<State>>,
    pub status: SolverStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypestateReport {
    pub protocol: String,
    pub allocations: Vec<AllocationReport>,
    pub violations: Vec<ProtocolViolation>,
}

impl TypestateReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &ProtocolViolation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// True when every forward query reached its fixpoint
    pub fn is_complete(&self) -> bool {
        self.allocations.iter().all(|a| a.status.is_complete())
    }
}

pub struct TypestateAnalysis {
    protocol: Arc<Protocol>,
    tracked_type: String,
    report_maybe_leaks: bool,
}

impl TypestateAnalysis {
    pub fn new(protocol: Protocol, tracked_type: impl Into<String>) -> Self {
        Self {
            protocol: Arc::new(protocol),
            tracked_type: tracked_type.into(),
            report_maybe_leaks: true,
        }
    }

    /// Report leaks on some paths only (default: on)
    pub fn report_maybe_leaks(mut self, enabled: bool) -> Self {
        self.report_maybe_leaks = enabled;
        self
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Forward queries at every allocation of the tracked type
    pub fn seeds(&self, program: &dyn ProgramModel) -> Vec<ForwardQuery> {
        let tracked = self.tracked_type.as_str();
        let mut generator = |stmt: &Statement, kind: &StatementKind| match kind.lhs() {
            Some(lhs) if kind.allocation_type_of(lhs) == Some(tracked) => {
                vec![Query::from(ForwardQuery::new(stmt.clone(), lhs.clone()))]
            }
            _ => Vec::new(),
        };
        AnalysisScope::new(program)
            .seeds(&mut generator)
            .into_iter()
            .filter_map(|q| match q {
                Query::Forward(q) => Some(q),
                Query::Backward(_) => None,
            })
            .collect()
    }

    pub fn run(&self, context: &AnalysisContext) -> Result<TypestateReport> {
        self.run_with_listener(context, &mut |_: &ProtocolViolation| {})
    }

    pub fn run_with_listener(
        &self,
        context: &AnalysisContext,
        listener: &mut dyn WitnessListener,
    ) -> Result<TypestateReport> {
        let program = context.program().as_ref();
        let weights = Arc::new(TypestateWeightFunctions::new(self.protocol.clone()));
        let mut report = TypestateReport {
            protocol: self.protocol.name.clone(),
            allocations: Vec::new(),
            violations: Vec::new(),
        };

        for query in self.seeds(program) {
            let mut engine = context
                .engine::<TransitionFunction>()
                .with_weight_functions(weights.clone());
            let handle = engine.seed(query.clone())?;
            let status = engine.solve(handle)?;
            let solver = engine.solver(handle)?;

            let end_states = self.end_states(program, solver);
            for (end_point, states) in group_by_statement(&end_states) {
                if let Some(violation) = self.judge(&query.node, end_point, &states) {
                    debug!(violation = %violation, "protocol violation");
                    listener.witness_found(&violation);
                    report.violations.push(violation);
                }
            }
            report.allocations.push(AllocationReport {
                allocation: query.node,
                end_states,
                status,
            });
        }

        info!(
            protocol = %report.protocol,
            allocations = report.allocations.len(),
            violations = report.violations.len(),
            "typestate analysis finished"
        );
        Ok(report)
    }

    /// States of every judged fact at a method end point
    fn end_states(
        &self,
        program: &dyn ProgramModel,
        solver: &SyncPdsSolver<TransitionFunction>,
    ) -> BTreeMap<Node, BTreeSet<State>> {
        let initial = self.protocol.initial_state();
        let reached = solver.reached_nodes();

        let mut at_end: BTreeMap<&Statement, Vec<&Node>> = BTreeMap::new();
        for node in &reached {
            if node.fact.is_returned() {
                continue;
            }
            if program.statement(&node.stmt).is_some_and(StatementKind::is_return) {
                at_end.entry(&node.stmt).or_default().push(node);
            }
        }

        let mut out = BTreeMap::new();
        for (stmt, nodes) in at_end {
            if nodes.iter().any(|n| escapes(program, solver, stmt, n)) {
                continue;
            }
            for node in nodes {
                let states = solver.node_weight(node).apply(&initial);
                if !states.is_empty() {
                    out.insert(node.clone(), states);
                }
            }
        }
        out
    }

    fn judge(
        &self,
        allocation: &Node,
        end_point: &Node,
        per_fact: &[BTreeSet<State>],
    ) -> Option<ProtocolViolation> {
        let protocol = &self.protocol;
        let all: BTreeSet<State> = per_fact.iter().flatten().cloned().collect();

        if all.iter().any(|s| protocol.is_error_state(s)) {
            return Some(ProtocolViolation::new(
                ViolationKind::InvalidTransition,
                allocation.clone(),
                end_point.clone(),
                all,
                format!("{} used in a state that forbids the call", protocol.name),
            ));
        }

        // an alias that is final on every path closes the object
        let closed = |states: &BTreeSet<State>| states.iter().all(|s| protocol.is_final_state(s));
        let open = |states: &BTreeSet<State>| states.iter().all(|s| !protocol.is_final_state(s));
        if per_fact.iter().any(closed) {
            return None;
        }
        if per_fact.iter().all(open) {
            return Some(ProtocolViolation::new(
                ViolationKind::ResourceLeak,
                allocation.clone(),
                end_point.clone(),
                all,
                format!("{} not in a final state at method exit", protocol.name),
            ));
        }
        self.report_maybe_leaks.then(|| {
            ProtocolViolation::new(
                ViolationKind::MaybeLeaked,
                allocation.clone(),
                end_point.clone(),
                all,
                format!("{} not in a final state on some paths", protocol.name),
            )
        })
    }
}

/// Held beyond the method: returned, a parameter, a static, or a field
fn escapes(
    program: &dyn ProgramModel,
    solver: &SyncPdsSolver<TransitionFunction>,
    end_point: &Statement,
    node: &Node,
) -> bool {
    let returned = matches!(
        program.statement(end_point),
        Some(StatementKind::Return { value: Some(v) }) if *v == node.fact
    );
    returned
        || node.fact.is_static()
        || program.is_parameter(&node.fact)
        || solver.field_stacks(node).iter().any(|stack| !stack.is_empty())
}

/// End points with the state sets of their facts; the reported node is
/// the first fact in order
fn group_by_statement(end_states: &BTreeMap<Node, BTreeSet<State>>) -> Vec<(&Node, Vec<BTreeSet<State>>)> {
    let mut out: Vec<(&Node, Vec<BTreeSet<State>>)> = Vec::new();
    for (node, states) in end_states {
        match out.last_mut() {
            Some((first, sets)) if first.stmt == node.stmt => sets.push(states.clone()),
            _ => out.push((node, vec![states.clone()])),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::features::query::{InMemoryProgram, MethodBuilder};
    use crate::features::typestate::infrastructure::FileProtocol;
    use crate::shared::models::Method;

    fn context(program: InMemoryProgram) -> AnalysisContext {
        AnalysisContext::new(Arc::new(program), AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_seeds_only_tracked_type() {
        let main = Method::new("Main", "main");
        let mut b = MethodBuilder::new(main.clone());
        b.alloc("f", "File");
        b.alloc("s", "String");
        b.ret(None);
        let mut program = InMemoryProgram::new();
        program.add_method(b);

        let analysis = TypestateAnalysis::new(FileProtocol::define(), "File");
        let seeds = analysis.seeds(&program);
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].node.fact.name, "f");
    }

    #[test]
    fn test_open_then_close_is_clean() {
        let main = Method::new("Main", "main");
        let mut b = MethodBuilder::new(main.clone());
        b.alloc("f", "File");
        b.call_virtual(None, "f", "open", &[]);
        b.call_virtual(None, "f", "close", &[]);
        b.ret(None);
        let mut program = InMemoryProgram::new();
        program.add_method(b);

        let report = TypestateAnalysis::new(FileProtocol::define(), "File")
            .run(&context(program))
            .unwrap();
        assert!(report.is_clean(), "{:?}", report.violations);
        assert!(report.is_complete());
    }

    #[test]
    fn test_witness_listener_sees_every_violation() {
        let main = Method::new("Main", "main");
        let mut b = MethodBuilder::new(main.clone());
        b.alloc("f", "File");
        b.call_virtual(None, "f", "open", &[]);
        b.ret(None);
        let mut program = InMemoryProgram::new();
        program.add_method(b);

        let mut seen = Vec::new();
        let report = TypestateAnalysis::new(FileProtocol::define(), "File")
            .run_with_listener(&context(program), &mut |v: &ProtocolViolation| seen.push(v.kind))
            .unwrap();
        assert_eq!(seen, vec![ViolationKind::ResourceLeak]);
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn test_returned_resource_not_judged() {
        let main = Method::new("Factory", "make");
        let mut b = MethodBuilder::new(main.clone());
        b.alloc("f", "File");
        b.call_virtual(None, "f", "open", &[]);
        b.ret(Some("f"));
        let mut program = InMemoryProgram::new();
        program.add_method(b);

        let report = TypestateAnalysis::new(FileProtocol::define(), "File")
            .run(&context(program))
            .unwrap();
        assert!(report.is_clean());
    }
}
