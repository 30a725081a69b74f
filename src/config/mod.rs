// src/config/mod.rs

//! Step and run configuration.
//!
//! - [`model`] holds the `serde` types read from TOML.
//! - [`loader`] reads files.
//! - [`validate`] turns a `RawConfigFile` into a checked `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{Condition, ConfigFile, RawConfigFile, RetryPolicy, RunSection, Step};
pub use validate::validate_step;
