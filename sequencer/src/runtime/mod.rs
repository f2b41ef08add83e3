//! Runtime data model: per-attempt sessions exposing the standard key/value
//! API to delivered content.
//!
//! Like [`crate::core`], nothing here performs I/O. Callers persist
//! [`session::RuntimeSession`] data themselves.

pub mod duration;
pub mod errors;
pub mod registry;
pub mod report;
pub mod service;
pub mod session;
