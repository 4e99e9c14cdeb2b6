//! Side-effecting collaborators: filesystem, child processes, build tool.

pub mod build;
pub mod config;
pub mod fixtures;
pub mod input;
pub mod process;
