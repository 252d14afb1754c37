//! Query layer infrastructure: statement semantics, call graph, program model

mod call_graph;
mod flow_functions;
mod in_memory_program;

pub use call_graph::OnTheFlyCallGraph;
pub use flow_functions::{
    DefaultBackwardFlowFunctions, DefaultForwardFlowFunctions, FactFlow, FlowFunctions,
};
pub use in_memory_program::{InMemoryProgram, MethodBuilder};
