//! Ports - interfaces implemented by program frontends

mod program_model;

pub use program_model::ProgramModel;
