//! CLI command implementations.

pub mod list;
pub mod run;
pub mod unoptimize;
pub mod worker;
