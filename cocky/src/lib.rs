#![deny(warnings)]

mod error;
pub use crate::error::GrammarError;

mod grammar;
pub use crate::grammar::{Body, GrammarBuilder, GrammarIndex, Production, ProductionId};

mod cache;
pub use crate::cache::{
    CacheStats, Derivation, DerivationCache, DerivationNode, NodeDisplay, NodeId, Side,
};

mod solver;
pub use crate::solver::{Chart, CykSolver, SharedSolver, DEFAULT_START};


#[cfg(test)]
mod palindrome_test;
