/*
 * Flow Functions
 *
 * Per-statement effect on a single fact. The query expander handles
 * placement: forward flows land on the statement they are computed for
 * (a successor of the current node), backward flows land on every
 * predecessor of the current node's statement.
 *
 * Forward (x holds the tracked object right after the previous statement):
 *   y = x        → x, y
 *   y = x.f      → x, pop f onto y
 *   x.f = y      (fact y) → y, push f onto x
 *   x = ...      → killed unless the rhs is x
 *
 * Backward (the value of x right after s is wanted):
 *   x = y        → y
 *   x = y.f      → push f onto y
 *   x = new T    → killed (allocation site)
 *   x.f = y      (fact x) → x, pop f onto y
 *
 * Calls: arguments, receiver and statics enter in-scope callees; the
 * call-to-return edge keeps facts the callees cannot touch.
 */

use crate::features::query::domain::Direction;
use crate::shared::models::{Field, Method, Node, Rvalue, Statement, StatementKind, Val};
use crate::shared::ports::ProgramModel;

/// Effect of one statement on one fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FactFlow {
    /// Same field stack
    Plain(Val),
    /// The tracked object moves one field deeper: `val.field`
    PushField(Val, Field),
    /// The tracked object is read out of `field`
    PopField(Val, Field),
}

/// Statement semantics consumed by the query expander
///
/// Implementations decide what a statement does to a fact; they never see
/// the automata. Wrap a default implementation to special-case calls
/// (e.g. cut every path through `System.exit`).
pub trait FlowFunctions: Send + Sync {
    fn direction(&self) -> Direction;

    /// Effect of the non-call statement `stmt` on `fact`
    fn normal_flow(&self, program: &dyn ProgramModel, fact: &Val, stmt: &Statement) -> Vec<FactFlow>;

    /// Callee-side nodes for `fact` entering `callee` at `call_site`
    fn call_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callee: &Method,
    ) -> Vec<Node>;

    /// Facts that bypass the call; `callees` are the in-scope targets
    fn call_to_return_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callees: &[Method],
    ) -> Vec<FactFlow>;

    /// Facts leaving their method at `exit`, tagged as returned
    fn return_flow(&self, program: &dyn ProgramModel, exit: &Node) -> Vec<Val>;

    /// Caller-side facts for a returned fact arriving at `call_site`
    fn map_returned(&self, program: &dyn ProgramModel, returned: &Val, call_site: &Statement) -> Vec<Val>;
}

/// Does any return statement of `method` return `val`?
fn returns_value(program: &dyn ProgramModel, method: &Method, val: &Val) -> bool {
    program.end_points(method).iter().any(|r| {
        matches!(
            program.statement(r),
            Some(StatementKind::Return { value: Some(v) }) if v == val
        )
    })
}

/// Map a fact returned from its method to the caller at `call_site`
///
/// Receiver and arguments always map back; the return value only when
/// `with_return_value` (forward queries).
fn map_to_caller(
    program: &dyn ProgramModel,
    returned: &Val,
    call_site: &Statement,
    with_return_value: bool,
) -> Vec<Val> {
    let val = returned.unreturned();
    if val.is_static() {
        return vec![val];
    }
    let (Some(callee), Some(StatementKind::Invoke { lhs, call })) =
        (val.method.as_ref(), program.statement(call_site))
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    if program.this_local(callee).as_ref() == Some(&val) {
        if let Some(receiver) = &call.receiver {
            out.push(receiver.clone());
        }
    }
    for (position, param) in program.parameters(callee).iter().enumerate() {
        if param == &val {
            if let Some(arg) = call.args.get(position) {
                out.push(arg.clone());
            }
        }
    }
    if with_return_value && returns_value(program, callee, &val) {
        if let Some(lhs) = lhs {
            out.push(lhs.clone());
        }
    }
    out.sort();
    out.dedup();
    out
}

/// Callee-side values bound to `fact` at `call_site`: `this`, parameters
/// and statics
fn bound_in_callee(program: &dyn ProgramModel, fact: &Val, call_site: &Statement, callee: &Method) -> Vec<Val> {
    if fact.is_static() {
        return vec![fact.clone()];
    }
    let Some(call) = program.invoke_expr(call_site) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if call.receiver.as_ref() == Some(fact) {
        if let Some(this) = program.this_local(callee) {
            out.push(this);
        }
    }
    let params = program.parameters(callee);
    for position in call.arg_positions(fact) {
        if let Some(param) = params.get(position) {
            out.push(param.clone());
        }
    }
    out
}

/// Call-to-return edge shared by both directions
fn bypass_call(program: &dyn ProgramModel, fact: &Val, call_site: &Statement, callees: &[Method]) -> Vec<FactFlow> {
    let Some(kind) = program.statement(call_site) else {
        return Vec::new();
    };
    if kind.lhs() == Some(fact) {
        return Vec::new();
    }
    let handled_by_callee = match kind.invoke_expr() {
        Some(call) => !callees.is_empty() && (call.uses(fact) || fact.is_static()),
        None => false,
    };
    if handled_by_callee {
        Vec::new()
    } else {
        vec![FactFlow::Plain(fact.clone())]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultForwardFlowFunctions;

impl FlowFunctions for DefaultForwardFlowFunctions {
    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn normal_flow(&self, program: &dyn ProgramModel, fact: &Val, stmt: &Statement) -> Vec<FactFlow> {
        match program.statement(stmt) {
            Some(StatementKind::Assign { lhs, rhs }) => {
                let mut out = Vec::new();
                if lhs != fact {
                    out.push(FactFlow::Plain(fact.clone()));
                }
                match rhs {
                    Rvalue::Local(y) if y == fact => out.push(FactFlow::Plain(lhs.clone())),
                    Rvalue::Load { base, field } if base == fact => {
                        out.push(FactFlow::PopField(lhs.clone(), field.clone()))
                    }
                    _ => {}
                }
                out
            }
            Some(StatementKind::Store { base, field, rhs }) => {
                let mut out = vec![FactFlow::Plain(fact.clone())];
                if rhs == fact {
                    out.push(FactFlow::PushField(base.clone(), field.clone()));
                }
                out
            }
            Some(_) => vec![FactFlow::Plain(fact.clone())],
            None => Vec::new(),
        }
    }

    fn call_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callee: &Method,
    ) -> Vec<Node> {
        let Some(entry) = program.entry(callee) else {
            return Vec::new();
        };
        bound_in_callee(program, fact, call_site, callee)
            .into_iter()
            .map(|val| Node::new(entry.clone(), val))
            .collect()
    }

    fn call_to_return_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callees: &[Method],
    ) -> Vec<FactFlow> {
        bypass_call(program, fact, call_site, callees)
    }

    fn return_flow(&self, program: &dyn ProgramModel, exit: &Node) -> Vec<Val> {
        let fact = &exit.fact;
        let returned_value = matches!(
            program.statement(&exit.stmt),
            Some(StatementKind::Return { value: Some(v) }) if v == fact
        );
        if returned_value || fact.is_static() || program.is_parameter(fact) {
            vec![fact.returned()]
        } else {
            Vec::new()
        }
    }

    fn map_returned(&self, program: &dyn ProgramModel, returned: &Val, call_site: &Statement) -> Vec<Val> {
        map_to_caller(program, returned, call_site, true)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackwardFlowFunctions;

impl FlowFunctions for DefaultBackwardFlowFunctions {
    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn normal_flow(&self, program: &dyn ProgramModel, fact: &Val, stmt: &Statement) -> Vec<FactFlow> {
        match program.statement(stmt) {
            Some(StatementKind::Assign { lhs, rhs }) if lhs == fact => match rhs {
                Rvalue::Local(y) => vec![FactFlow::Plain(y.clone())],
                Rvalue::Load { base, field } => vec![FactFlow::PushField(base.clone(), field.clone())],
                Rvalue::New { .. } | Rvalue::Null => Vec::new(),
            },
            Some(StatementKind::Store { base, field, rhs }) if base == fact => vec![
                FactFlow::PopField(rhs.clone(), field.clone()),
                FactFlow::Plain(fact.clone()),
            ],
            Some(StatementKind::Entry) | None => Vec::new(),
            Some(_) => vec![FactFlow::Plain(fact.clone())],
        }
    }

    fn call_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callee: &Method,
    ) -> Vec<Node> {
        let defines_fact = program
            .statement(call_site)
            .and_then(StatementKind::lhs)
            == Some(fact);
        let bound = bound_in_callee(program, fact, call_site, callee);

        let mut out = Vec::new();
        for exit in program.end_points(callee) {
            if defines_fact {
                if let Some(StatementKind::Return { value: Some(v) }) = program.statement(&exit) {
                    out.push(Node::new(exit.clone(), v.clone()));
                }
            }
            for val in &bound {
                out.push(Node::new(exit.clone(), val.clone()));
            }
        }
        out
    }

    fn call_to_return_flow(
        &self,
        program: &dyn ProgramModel,
        fact: &Val,
        call_site: &Statement,
        callees: &[Method],
    ) -> Vec<FactFlow> {
        bypass_call(program, fact, call_site, callees)
    }

    fn return_flow(&self, program: &dyn ProgramModel, exit: &Node) -> Vec<Val> {
        let fact = &exit.fact;
        if fact.is_static() || program.is_parameter(fact) {
            vec![fact.returned()]
        } else {
            Vec::new()
        }
    }

    fn map_returned(&self, program: &dyn ProgramModel, returned: &Val, call_site: &Statement) -> Vec<Val> {
        map_to_caller(program, returned, call_site, false)
    }
}
