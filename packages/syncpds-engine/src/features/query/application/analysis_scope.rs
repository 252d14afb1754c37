/*
 * Analysis Scope
 *
 * Enumerates seed queries over every in-scope method, in program order.
 * A generator sees each statement once and proposes queries for it.
 */

use crate::features::query::domain::{BackwardQuery, ForwardQuery, Query};
use crate::shared::models::{Statement, StatementKind};
use crate::shared::ports::ProgramModel;
use rustc_hash::FxHashSet;

/// Proposes seed queries for one statement
pub trait SeedGenerator {
    fn generate(&mut self, stmt: &Statement, kind: &StatementKind) -> Vec<Query>;
}

impl<F> SeedGenerator for F
where
    F: FnMut(&Statement, &StatementKind) -> Vec<Query>,
{
    fn generate(&mut self, stmt: &Statement, kind: &StatementKind) -> Vec<Query> {
        self(stmt, kind)
    }
}

pub struct AnalysisScope<'a> {
    program: &'a dyn ProgramModel,
}

impl<'a> AnalysisScope<'a> {
    pub fn new(program: &'a dyn ProgramModel) -> Self {
        Self { program }
    }

    /// Queries proposed by `generator`, first occurrence kept
    pub fn seeds(&self, generator: &mut dyn SeedGenerator) -> Vec<Query> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for method in self.program.methods() {
            if !self.program.in_scope(&method) {
                continue;
            }
            for stmt in self.program.statements(&method) {
                let Some(kind) = self.program.statement(&stmt) else {
                    continue;
                };
                for query in generator.generate(&stmt, kind) {
                    if seen.insert(query.clone()) {
                        out.push(query);
                    }
                }
            }
        }
        out
    }

    /// One forward query per allocation statement
    pub fn allocation_sites(&self) -> Vec<ForwardQuery> {
        let mut generator = |stmt: &Statement, kind: &StatementKind| match kind.lhs() {
            Some(lhs) if kind.is_allocation() => {
                vec![Query::from(ForwardQuery::new(stmt.clone(), lhs.clone()))]
            }
            _ => Vec::new(),
        };
        self.seeds(&mut generator)
            .into_iter()
            .filter_map(|q| match q {
                Query::Forward(q) => Some(q),
                Query::Backward(_) => None,
            })
            .collect()
    }

    /// Backward queries for every argument passed to a call of
    /// `method_name`, asked right before the call
    pub fn arguments_of(&self, method_name: &str) -> Vec<BackwardQuery> {
        let program = self.program;
        let mut generator = |stmt: &Statement, kind: &StatementKind| {
            let Some(call) = kind.invoke_expr() else {
                return Vec::new();
            };
            if call.method_name != method_name {
                return Vec::new();
            }
            let preds = program.predecessors(stmt);
            call.args
                .iter()
                .filter(|arg| !arg.is_static())
                .flat_map(|arg| {
                    preds
                        .iter()
                        .map(move |pred| Query::from(BackwardQuery::new(pred.clone(), arg.clone())))
                })
                .collect()
        };
        self.seeds(&mut generator)
            .into_iter()
            .filter_map(|q| match q {
                Query::Backward(q) => Some(q),
                Query::Forward(_) => None,
            })
            .collect()
    }
}
