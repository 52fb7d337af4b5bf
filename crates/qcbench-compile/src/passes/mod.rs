//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: passes that operate purely on circuit structure
//! - [`target`]: passes that require target properties

pub mod agnostic;
pub mod target;

pub use agnostic::{CancelAdjacent, CommutativeCancellation, OneQubitBasis, Optimize1qGates};
pub use target::{BasicRouting, BasisTranslation, DenseLayout};
