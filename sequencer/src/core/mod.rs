//! Deterministic sequencing logic.
//!
//! Core modules must be free of I/O side effects. They operate on the
//! in-memory activity tree and return deterministic outputs suitable for
//! tests; randomization draws from a caller-supplied seeded generator.

pub mod activity;
pub mod definition;
pub mod delivery;
pub mod engine;
pub mod exceptions;
pub mod flow;
pub mod invariants;
pub mod navigation;
pub mod rollup;
pub mod rules;
pub mod sequencing;
pub mod state;
pub mod termination;
pub mod tree;
pub mod types;
