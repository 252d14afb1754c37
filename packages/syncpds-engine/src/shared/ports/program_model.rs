/*
 * ProgramModel Port
 *
 * Everything the solver reads about the analyzed program:
 * - statements and intraprocedural control flow
 * - statically known call targets + virtual dispatch
 * - the inclusion/exclusion scope predicate
 *
 * Implementations are read-only from the solver's perspective and are
 * shared across worker threads.
 */

use crate::shared::models::{
    ControlFlowEdge, InvokeExpr, Method, Rvalue, Statement, StatementKind, Val,
};

/// Program representation consumed by the analysis
pub trait ProgramModel: Send + Sync {
    /// All methods of the program
    fn methods(&self) -> Vec<Method>;

    /// Statements of `method` in index order
    fn statements(&self, method: &Method) -> Vec<Statement>;

    /// Shape of a statement, `None` when unknown
    fn statement(&self, stmt: &Statement) -> Option<&StatementKind>;

    /// Intraprocedural control-flow edges of `method`
    fn edges(&self, method: &Method) -> Vec<ControlFlowEdge>;

    /// Formal parameters of `method`, in position order
    fn parameters(&self, method: &Method) -> Vec<Val>;

    /// Receiver local of an instance method
    fn this_local(&self, method: &Method) -> Option<Val>;

    /// Statically known targets of the call at `stmt`
    fn call_targets(&self, stmt: &Statement) -> Vec<Method>;

    /// Dispatch `method_name` on an object of type `type_name`
    fn resolve_virtual(&self, type_name: &str, method_name: &str) -> Option<Method>;

    /// Excluded methods are opaque: never entered, never analyzed
    fn in_scope(&self, method: &Method) -> bool;

    fn successors(&self, stmt: &Statement) -> Vec<Statement> {
        self.edges(&stmt.method)
            .into_iter()
            .filter(|e| &e.from == stmt)
            .map(|e| e.to)
            .collect()
    }

    fn predecessors(&self, stmt: &Statement) -> Vec<Statement> {
        self.edges(&stmt.method)
            .into_iter()
            .filter(|e| &e.to == stmt)
            .map(|e| e.from)
            .collect()
    }

    /// Entry statement of `method`
    fn entry(&self, method: &Method) -> Option<Statement> {
        self.statements(method)
            .into_iter()
            .find(|s| matches!(self.statement(s), Some(StatementKind::Entry)))
    }

    /// Return statements of `method`
    fn end_points(&self, method: &Method) -> Vec<Statement> {
        self.statements(method)
            .into_iter()
            .filter(|s| self.statement(s).is_some_and(StatementKind::is_return))
            .collect()
    }

    fn is_assignment(&self, stmt: &Statement) -> bool {
        matches!(
            self.statement(stmt),
            Some(StatementKind::Assign { .. }) | Some(StatementKind::Store { .. })
        )
    }

    fn left_operand(&self, stmt: &Statement) -> Option<Val> {
        self.statement(stmt).and_then(|k| k.lhs().cloned())
    }

    fn right_operand(&self, stmt: &Statement) -> Option<Rvalue> {
        match self.statement(stmt)? {
            StatementKind::Assign { rhs, .. } => Some(rhs.clone()),
            StatementKind::Store { rhs, .. } => Some(Rvalue::Local(rhs.clone())),
            _ => None,
        }
    }

    fn contains_call(&self, stmt: &Statement) -> bool {
        self.invoke_expr(stmt).is_some()
    }

    fn invoke_expr(&self, stmt: &Statement) -> Option<&InvokeExpr> {
        self.statement(stmt).and_then(StatementKind::invoke_expr)
    }

    fn argument(&self, stmt: &Statement, index: usize) -> Option<Val> {
        self.invoke_expr(stmt)
            .and_then(|call| call.args.get(index).cloned())
    }

    /// Parameter or `this` of its method
    fn is_parameter(&self, val: &Val) -> bool {
        match &val.method {
            Some(m) => {
                let plain = val.unreturned();
                self.this_local(m).as_ref() == Some(&plain)
                    || self.parameters(m).contains(&plain)
            }
            None => false,
        }
    }
}
