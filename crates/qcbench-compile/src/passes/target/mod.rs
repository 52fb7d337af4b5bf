//! Target-specific compilation passes.
//!
//! These passes require target properties from the PropertySet
//! (coupling map, basis gates, layout).

pub mod layout;
pub mod routing;
pub mod translation;

pub use layout::DenseLayout;
pub use routing::BasicRouting;
pub use translation::BasisTranslation;
