//! Shared test infrastructure for Hyperproofs integration tests.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
