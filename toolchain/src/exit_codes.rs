//! Stable exit codes for toolchain CLI commands.

/// Command succeeded and every target or case passed.
pub const OK: i32 = 0;
/// Invalid options or config, a failing external tool, or a target that exited non-zero.
pub const FAILURE: i32 = 1;
/// Unexpected error; the full diagnostic chain is printed.
pub const INTERNAL: i32 = 2;
/// `toolchain test` ran and at least one case failed.
pub const TESTS_FAILED: i32 = 3;
