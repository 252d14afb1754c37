use crate::features::typestate::domain::{Action, Protocol, TransitionFunction};
use crate::features::weights::{Weight, WeightFunctions};
use crate::shared::models::{Node, Statement, StatementKind};
use crate::shared::ports::ProgramModel;
use std::sync::Arc;

/// Weights for forward typestate queries
///
/// A step into a call statement whose receiver is the tracked fact and
/// whose method name belongs to the protocol carries that action's
/// transition function. Protocol methods are treated as library calls:
/// the action applies on the call-to-return edge, never on call entry.
#[derive(Debug, Clone)]
pub struct TypestateWeightFunctions {
    protocol: Arc<Protocol>,
}

impl TypestateWeightFunctions {
    pub fn new(protocol: Arc<Protocol>) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    fn action_at(&self, program: &dyn ProgramModel, curr: &Node, stmt: &Statement) -> Option<Action> {
        let StatementKind::Invoke { call, .. } = program.statement(stmt)? else {
            return None;
        };
        let on_fact = call.receiver.as_ref() == Some(&curr.fact);
        (on_fact && self.protocol.tracks(&call.method_name)).then(|| Action::new(&call.method_name))
    }
}

impl WeightFunctions<TransitionFunction> for TypestateWeightFunctions {
    fn normal(&self, program: &dyn ProgramModel, curr: &Node, succ: &Node) -> TransitionFunction {
        if curr.fact != succ.fact {
            return TransitionFunction::one();
        }
        match self.action_at(program, curr, &succ.stmt) {
            Some(action) => TransitionFunction::from_action(&self.protocol, &action),
            None => TransitionFunction::one(),
        }
    }

    fn push(
        &self,
        _program: &dyn ProgramModel,
        _curr: &Node,
        _callee_entry: &Node,
        _call_site: &Statement,
    ) -> TransitionFunction {
        TransitionFunction::one()
    }

    fn pop(&self, _program: &dyn ProgramModel, _exit: &Node) -> TransitionFunction {
        TransitionFunction::one()
    }
}
