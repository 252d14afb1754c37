/*
 * Query Expander
 *
 * Turns flow functions into solver successors. Placement:
 * - forward:  node (s, x) steps to every successor s' of s; the effect
 *             computed is the one of s'
 * - backward: node (s, x) applies s itself and lands on every
 *             predecessor of s
 *
 * Returned facts (x^ret at a call site) are mapped into the caller first.
 * Label-dependent effects (allocation sites, field POIs) are reported
 * from `observe_field_label`, once per (node, label).
 */

use crate::config::AnalysisConfig;
use crate::features::query::domain::Direction;
use crate::features::query::infrastructure::{FactFlow, FlowFunctions, OnTheFlyCallGraph};
use crate::features::sync_pds::{Expansion, NodeExpander, PoiKey, Successor};
use crate::features::weights::{Weight, WeightFunctions};
use crate::shared::models::{Field, InvokeExpr, Method, Node, Rvalue, Statement, StatementKind};
use crate::shared::ports::ProgramModel;

pub(crate) struct QueryExpander<'a, W: Weight> {
    program: &'a dyn ProgramModel,
    call_graph: &'a OnTheFlyCallGraph,
    flows: &'a dyn FlowFunctions,
    weights: &'a dyn WeightFunctions<W>,
    config: &'a AnalysisConfig,
}

impl<'a, W: Weight> QueryExpander<'a, W> {
    pub(crate) fn new(
        program: &'a dyn ProgramModel,
        call_graph: &'a OnTheFlyCallGraph,
        flows: &'a dyn FlowFunctions,
        weights: &'a dyn WeightFunctions<W>,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            program,
            call_graph,
            flows,
            weights,
            config,
        }
    }

    fn direction(&self) -> Direction {
        self.flows.direction()
    }

    /// Successor for `flow` landing at `at`
    fn place(&self, curr: &Node, at: &Statement, flow: FactFlow) -> Successor<W> {
        match flow {
            FactFlow::Plain(val) => {
                let node = Node::new(at.clone(), val);
                let weight = self.weights.normal(self.program, curr, &node);
                Successor::Normal { node, weight }
            }
            FactFlow::PushField(val, field) => {
                let node = Node::new(at.clone(), val);
                let weight = self.weights.normal(self.program, curr, &node);
                Successor::FieldPush {
                    node,
                    field,
                    weight,
                }
            }
            FactFlow::PopField(val, field) => {
                let node = Node::new(at.clone(), val);
                let weight = self.weights.normal(self.program, curr, &node);
                Successor::FieldPop {
                    node,
                    field,
                    weight,
                }
            }
        }
    }

    /// Statements a flow computed at `stmt` lands on
    fn landing_sites(&self, stmt: &Statement) -> Vec<Statement> {
        match self.direction() {
            Direction::Forward => vec![stmt.clone()],
            Direction::Backward => self.program.predecessors(stmt),
        }
    }

    fn exit(&self, node: &Node, out: &mut Expansion<W>) {
        for returned in self.flows.return_flow(self.program, node) {
            let weight = self.weights.pop(self.program, node);
            out.push(Successor::CallPop { returned, weight });
        }
    }

    /// Arrival of a returned fact at its return site
    fn map_return_site(&self, node: &Node) -> Expansion<W> {
        let mut out = Expansion::new();
        let mapped = self
            .flows
            .map_returned(self.program, &node.fact, &node.stmt);
        let sites = self.landing_sites(&node.stmt);
        for val in mapped {
            for at in &sites {
                out.push(self.place(node, at, FactFlow::Plain(val.clone())));
            }
        }
        out
    }

    /// `curr` meets the call at `call_site`
    fn call(&self, curr: &Node, call_site: &Statement, call: &InvokeExpr, out: &mut Expansion<W>) {
        let callees = self.call_graph.callees(self.program, call_site);
        let in_scope: Vec<Method> = callees
            .iter()
            .filter(|m| self.program.in_scope(m))
            .cloned()
            .collect();

        for callee in &in_scope {
            for target in self
                .flows
                .call_flow(self.program, &curr.fact, call_site, callee)
            {
                let weight = self.weights.push(self.program, curr, &target, call_site);
                out.push(Successor::CallPush {
                    node: target,
                    call_site: call_site.clone(),
                    weight,
                });
            }
        }

        let bypass = self
            .flows
            .call_to_return_flow(self.program, &curr.fact, call_site, &in_scope);
        let sites = self.landing_sites(call_site);
        for flow in bypass {
            for at in &sites {
                out.push(self.place(curr, at, flow.clone()));
            }
        }

        let defines_fact = self.direction() == Direction::Backward
            && self.program.left_operand(call_site).as_ref() == Some(&curr.fact);
        let unresolved = callees.is_empty()
            && call.is_virtual()
            && (call.uses(&curr.fact) || curr.fact.is_static() || defines_fact);
        if unresolved && self.config.on_the_fly_call_graph {
            if let Some(receiver) = &call.receiver {
                out.defer(PoiKey::call_site(call_site.clone(), receiver.clone()), Vec::new());
            }
        }
    }

    fn expand_forward(&self, node: &Node, kind: &StatementKind) -> Expansion<W> {
        let mut out = Expansion::new();
        if kind.is_return() {
            self.exit(node, &mut out);
        }
        for succ in self.program.successors(&node.stmt) {
            match self.program.invoke_expr(&succ) {
                Some(call) => self.call(node, &succ, call, &mut out),
                None => {
                    for flow in self.flows.normal_flow(self.program, &node.fact, &succ) {
                        out.push(self.place(node, &succ, flow));
                    }
                }
            }
        }
        out
    }

    fn expand_backward(&self, node: &Node, kind: &StatementKind) -> Expansion<W> {
        let mut out = Expansion::new();
        match kind {
            StatementKind::Entry => self.exit(node, &mut out),
            StatementKind::Invoke { call, .. } => self.call(node, &node.stmt, call, &mut out),
            _ => {
                let preds = self.program.predecessors(&node.stmt);
                for flow in self.flows.normal_flow(self.program, &node.fact, &node.stmt) {
                    for pred in &preds {
                        out.push(self.place(node, pred, flow.clone()));
                    }
                }
            }
        }
        out
    }

    /// Backward: allocation of the value itself, field writes through
    /// another base
    fn observe_backward(&self, node: &Node, kind: &StatementKind, label: &Field) -> Expansion<W> {
        let mut out = Expansion::new();
        if label.is_empty_field() && kind.allocation_type_of(&node.fact).is_some() {
            out.allocation_site = true;
        }
        if !self.config.resolve_field_aliases {
            return out;
        }
        if let StatementKind::Store { base, field, rhs } = kind {
            if base != &node.fact && field == label {
                let successors = self
                    .program
                    .predecessors(&node.stmt)
                    .into_iter()
                    .map(|pred| {
                        self.place(node, &pred, FactFlow::PopField(rhs.clone(), field.clone()))
                    })
                    .collect();
                let key = PoiKey::field_write(node.stmt.clone(), base.clone(), field.clone());
                out.defer(key, successors);
            }
        }
        out
    }

    /// Forward: loads of the label through another base
    fn observe_forward(&self, node: &Node, label: &Field) -> Expansion<W> {
        let mut out = Expansion::new();
        if !self.config.resolve_field_aliases {
            return out;
        }
        for succ in self.program.successors(&node.stmt) {
            let Some(StatementKind::Assign {
                lhs,
                rhs: Rvalue::Load { base, field },
            }) = self.program.statement(&succ)
            else {
                continue;
            };
            if base != &node.fact && field == label {
                let successor =
                    self.place(node, &succ, FactFlow::PopField(lhs.clone(), field.clone()));
                let key = PoiKey::field_read(succ.clone(), base.clone(), field.clone());
                out.defer(key, vec![successor]);
            }
        }
        out
    }
}

impl<W: Weight> NodeExpander<W> for QueryExpander<'_, W> {
    fn expand(&mut self, node: &Node) -> Expansion<W> {
        if node.fact.is_returned() {
            return self.map_return_site(node);
        }
        let Some(kind) = self.program.statement(&node.stmt) else {
            return Expansion::new();
        };
        match self.direction() {
            Direction::Forward => self.expand_forward(node, kind),
            Direction::Backward => self.expand_backward(node, kind),
        }
    }

    fn observe_field_label(&mut self, node: &Node, label: &Field) -> Expansion<W> {
        if node.fact.is_returned() {
            return Expansion::new();
        }
        match self.direction() {
            Direction::Forward => self.observe_forward(node, label),
            Direction::Backward => match self.program.statement(&node.stmt) {
                Some(kind) => self.observe_backward(node, kind, label),
                None => Expansion::new(),
            },
        }
    }

    fn callers_of(&mut self, method: &Method) -> Vec<Statement> {
        self.call_graph.callers_of(self.program, method)
    }
}
