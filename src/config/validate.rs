// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile, Step};
use crate::errors::{DagnodeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagnodeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.run, raw.step))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_steps(cfg)?;
    validate_step_names(cfg)?;
    for step in cfg.step.iter() {
        validate_step(step)?;
    }
    Ok(())
}

fn ensure_has_steps(cfg: &RawConfigFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(DagnodeError::ConfigError(
            "config must contain at least one [[step]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_step_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for step in cfg.step.iter() {
        if step.name.trim().is_empty() {
            return Err(DagnodeError::ConfigError(
                "every step must have a non-empty `name`".to_string(),
            ));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(DagnodeError::ConfigError(format!(
                "duplicate step name '{}'",
                step.name
            )));
        }
    }
    Ok(())
}

/// Validate a single step in isolation.
pub fn validate_step(step: &Step) -> Result<()> {
    match (&step.cmd, &step.command, &step.script) {
        (Some(cmd), None, None) => {
            if cmd.trim().is_empty() {
                return Err(DagnodeError::ConfigError(format!(
                    "step '{}' has an empty `cmd`",
                    step.name
                )));
            }
            if !step.args.is_empty() {
                return Err(DagnodeError::ConfigError(format!(
                    "step '{}' cannot combine `cmd` with `args`",
                    step.name
                )));
            }
        }
        (Some(_), _, _) => {
            return Err(DagnodeError::ConfigError(format!(
                "step '{}' cannot combine `cmd` with `command` or `script`",
                step.name
            )));
        }
        (None, None, None) => {
            return Err(DagnodeError::ConfigError(format!(
                "step '{}' needs one of `cmd`, `command` or `script`",
                step.name
            )));
        }
        (None, Some(command), _) if command.trim().is_empty() => {
            return Err(DagnodeError::ConfigError(format!(
                "step '{}' has an empty `command`",
                step.name
            )));
        }
        _ => {}
    }

    if let Some(ref output) = step.output {
        if !is_env_name(output) {
            return Err(DagnodeError::ConfigError(format!(
                "step '{}' has invalid `output` variable name '{}'",
                step.name, output
            )));
        }
    }

    for key in step.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(DagnodeError::ConfigError(format!(
                "step '{}' has invalid env key '{}'",
                step.name, key
            )));
        }
    }

    Ok(())
}

fn is_env_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str) -> Step {
        Step {
            name: name.to_string(),
            ..Step::default()
        }
    }

    #[test]
    fn cmd_alone_is_valid() {
        let s = Step {
            cmd: Some("echo hi".into()),
            ..step("a")
        };
        assert!(validate_step(&s).is_ok());
    }

    #[test]
    fn script_without_command_is_valid() {
        let s = Step {
            script: Some("echo hi".into()),
            ..step("a")
        };
        assert!(validate_step(&s).is_ok());
    }

    #[test]
    fn cmd_and_script_conflict() {
        let s = Step {
            cmd: Some("echo hi".into()),
            script: Some("echo hi".into()),
            ..step("a")
        };
        let err = validate_step(&s).unwrap_err();
        assert!(err.to_string().contains("cannot combine"));
    }

    #[test]
    fn missing_command_is_rejected() {
        let err = validate_step(&step("a")).unwrap_err();
        assert!(err.to_string().contains("needs one of"));
    }

    #[test]
    fn output_name_must_be_identifier() {
        let s = Step {
            cmd: Some("echo hi".into()),
            output: Some("1BAD-NAME".into()),
            ..step("a")
        };
        assert!(validate_step(&s).is_err());

        let s = Step {
            output: Some("_GOOD_1".into()),
            ..s
        };
        assert!(validate_step(&s).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let raw = RawConfigFile {
            step: vec![
                Step {
                    cmd: Some("true".into()),
                    ..step("a")
                },
                Step {
                    cmd: Some("true".into()),
                    ..step("a")
                },
            ],
            ..RawConfigFile::default()
        };
        match ConfigFile::try_from(raw) {
            Err(DagnodeError::ConfigError(msg)) => assert!(msg.contains("duplicate")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
