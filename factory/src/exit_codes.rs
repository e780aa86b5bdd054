//! Stable exit codes for `cf` commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, config, run id, or missing artifact, or any other error.
pub const INVALID: i32 = 1;
/// A stage failed; the failure was recorded in the run's meta.
pub const STAGE_FAILED: i32 = 2;
