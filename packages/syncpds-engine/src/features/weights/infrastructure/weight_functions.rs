use crate::features::weights::domain::Weight;
use crate::shared::models::{Node, Statement};
use crate::shared::ports::ProgramModel;

/// Weight of each edge the query layer adds
///
/// - `normal`: intraprocedural step `curr → succ`
/// - `push`: entering a callee at `call_site`
/// - `pop`: leaving a callee from `exit`
pub trait WeightFunctions<W: Weight>: Send + Sync {
    fn normal(&self, program: &dyn ProgramModel, curr: &Node, succ: &Node) -> W;

    fn push(
        &self,
        program: &dyn ProgramModel,
        curr: &Node,
        callee_entry: &Node,
        call_site: &Statement,
    ) -> W;

    fn pop(&self, program: &dyn ProgramModel, exit: &Node) -> W;
}

/// Every edge weighs `one`
#[derive(Debug, Clone, Copy, Default)]
pub struct OneWeightFunctions;

impl<W: Weight> WeightFunctions<W> for OneWeightFunctions {
    fn normal(&self, _program: &dyn ProgramModel, _curr: &Node, _succ: &Node) -> W {
        W::one()
    }

    fn push(
        &self,
        _program: &dyn ProgramModel,
        _curr: &Node,
        _callee_entry: &Node,
        _call_site: &Statement,
    ) -> W {
        W::one()
    }

    fn pop(&self, _program: &dyn ProgramModel, _exit: &Node) -> W {
        W::one()
    }
}
