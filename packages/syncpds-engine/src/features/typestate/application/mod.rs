/*
 * Typestate Application Layer
 *
 * Forward typestate queries over every tracked allocation.
 */

mod analysis;

pub use analysis::{AllocationReport, TypestateAnalysis, TypestateReport, WitnessListener};
