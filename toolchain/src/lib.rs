//! Case composition and execution dispatch for a simulation code's toolchain.
//!
//! Test cases are composed from nested parameter overrides on a
//! [`core::stack::CompositionStack`], identified by a hash of their lineage,
//! and materialized as self-describing descriptors. Runs are dispatched
//! through a closed set of [`engine`] backends (direct MPI launch or a batch
//! scheduler) behind an explicit lifecycle.
//!
//! - **[`core`]**: pure, deterministic logic (parameters, composition, case
//!   identity, option validation, the regression suite). No I/O.
//! - **[`io`]**: side effects (config, child processes, fixtures, input decks,
//!   builds).
//!
//! Orchestration modules ([`run`], [`testing`]) combine the two for the CLI
//! commands, with a [`context::RunContext`] passed explicitly through every call.

pub mod context;
pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod testing;
