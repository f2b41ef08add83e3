//! Stable exit codes for sequencer CLI commands.

/// Command succeeded or an activity was delivered.
pub const OK: i32 = 0;
/// Command failed due to an invalid tree, state, config or arguments.
pub const INVALID: i32 = 1;
/// `sequencer navigate` delivered nothing (sequencing exception or the
/// learner must choose).
pub const NO_DELIVERY: i32 = 2;
/// `sequencer navigate` ended the sequencing session.
pub const SESSION_ENDED: i32 = 3;
