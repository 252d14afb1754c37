//! Shared module - Program model types and ports
//!
//! Value types every feature speaks (methods, statements, values,
//! fields, nodes) plus the `ProgramModel` port implemented by frontends.

pub mod models;
pub mod ports;

// Re-exports for convenience
pub use models::*;
pub use ports::ProgramModel;
