//! Feature modules (vertical slices)
//!
//! Dependency order: weights → wpds → sync_pds → query → typestate

pub mod query;
pub mod sync_pds;
pub mod typestate;
pub mod weights;
pub mod wpds;
