//! Wire types for the sandbox REST api.

pub mod rest;

/// Numeric verdict statuses as they appear on the wire.
pub mod status_codes {
    /// Every run completed, all outputs collected.
    pub const SUCCESS: i32 = 1;
    /// The sandbox itself failed: missing tooling, spawn refusal, filesystem
    /// trouble. Not the submission's fault.
    pub const SANDBOX_ERROR: i32 = 2;
    /// The submission failed: compile diagnostics, nonzero exit, stderr
    /// output, or a time limit.
    pub const RUNTIME_ERROR: i32 = 3;
}
