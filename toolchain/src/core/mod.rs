//! Deterministic, pure logic for case composition and job options.
//!
//! Core modules must be free of I/O side effects. Materializing and running
//! cases happens in [`crate::io`].

pub mod baseline;
pub mod case;
pub mod options;
pub mod params;
pub mod stack;
pub mod suite;
