mod phase;
mod poi;
mod successor;

pub use phase::{SolverPhase, SolverStats, SolverStatus};
pub use poi::{PoiKey, PoiKind, PointOfIndirection, Resolution};
pub use successor::{Expansion, PendingIndirection, Successor};
