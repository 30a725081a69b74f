// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] resolves a step into a program + arguments and builds the
//!   `tokio::process::Command`.
//! - [`env`] expands command lines against, and publishes captured output
//!   into, the shared process environment.
//! - `process` spawns the command, tees its output and waits for exit or
//!   cancellation.
//! - [`signal`] delivers signals to a whole process group.

pub mod command;
pub mod env;
pub(crate) mod process;
pub mod signal;

pub use command::{CommandLine, split_command};
pub use env::{expand_env, publish_output};
pub use signal::signal_group;
