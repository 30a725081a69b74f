// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `dagnode`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagnode",
    version,
    about = "Run configured steps as supervised OS processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run only the step with this name.
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Directory for per-attempt log files. Overrides `[run].log_dir`.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Identifier of this run. Overrides `[run].request_id`.
    #[arg(long, value_name = "ID")]
    pub request_id: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGNODE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate and print the steps, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dagnode_toml() {
        let args = CliArgs::try_parse_from(["dagnode"]).unwrap();
        assert_eq!(args.config, PathBuf::from("Dagnode.toml"));
        assert!(args.step.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn parses_overrides() {
        let args = CliArgs::try_parse_from([
            "dagnode",
            "--config",
            "x.toml",
            "--step",
            "build",
            "--log-dir",
            "/tmp/logs",
            "--request-id",
            "r1",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.step.as_deref(), Some("build"));
        assert_eq!(args.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(args.request_id.as_deref(), Some("r1"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
