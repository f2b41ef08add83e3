//! Activity tree sequencing engine and runtime data-model sessions.
//!
//! The crate implements the Simple Sequencing model used by e-learning
//! content packages, plus the key/value runtime API that delivered content
//! talks to. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic sequencing (navigation, termination,
//!   flow, delivery, rollup). No I/O, fully testable in isolation.
//! - **[`runtime`]**: Runtime sessions over the two data-model revisions,
//!   with typed validation and numeric error codes. Also I/O free.
//! - **[`io`]**: Trees, saved state and configuration on disk, used by the
//!   CLI binary.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod runtime;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
