//! Target-agnostic compilation passes.
//!
//! These passes only look at the instruction list and never consult the
//! coupling map. Each one preserves the circuit unitary up to global phase.

pub mod optimization;

pub use optimization::{CancelAdjacent, CommutativeCancellation, OneQubitBasis, Optimize1qGates};
