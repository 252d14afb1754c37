/*
 * Typestate Infrastructure
 *
 * Built-in protocols, the protocol parser and the weight functions that
 * turn a protocol into a weight domain.
 */

mod built_in;
mod protocol_parser;
mod typestate_weights;

pub use built_in::{ConnectionProtocol, FileProtocol, LockProtocol};
pub use protocol_parser::{
    ParseError, PreconditionConfig, ProtocolBuilder, ProtocolConfig, ProtocolParser,
    TransitionConfig,
};
pub use typestate_weights::TypestateWeightFunctions;
