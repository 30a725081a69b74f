// src/exec/command.rs

//! Turning a `Step` into a ready-to-spawn `tokio::process::Command`.

use std::mem;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::Step;
use crate::errors::NodeError;
use crate::exec::env::expand_env;

/// Interpreter used for a script step that names no command.
pub const DEFAULT_SHELL: &str = "sh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

/// Split a command line into words, honouring single quotes, double quotes
/// and backslash escapes. Returns `None` for a blank line.
pub fn split_command(line: &str) -> Option<CommandLine> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some('"') if c == '\\' => match chars.next() {
                Some(next @ ('"' | '\\' | '$' | '`')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }
    if in_word {
        words.push(current);
    }

    let mut words = words.into_iter();
    let program = words.next()?;
    Some(CommandLine {
        program,
        args: words.collect(),
    })
}

/// Work out what to run for `step`.
///
/// An unsplit `cmd` is expanded against the environment as it is right now,
/// so values published by earlier nodes are visible. A script path, when
/// given, goes after the configured arguments.
pub(crate) fn resolve(step: &Step, script: Option<&Path>) -> Result<CommandLine, NodeError> {
    let mut line = match step.cmd {
        Some(ref cmd) => split_command(&expand_env(cmd)).ok_or(NodeError::EmptyCommand)?,
        None => {
            let program = match step.command {
                Some(ref c) if !c.trim().is_empty() => c.clone(),
                _ if step.script.is_some() => DEFAULT_SHELL.to_string(),
                _ => return Err(NodeError::EmptyCommand),
            };
            CommandLine {
                program,
                args: step.args.clone(),
            }
        }
    };

    if let Some(script) = script {
        line.args.push(script.to_string_lossy().into_owned());
    }
    Ok(line)
}

/// Build the command for `line` in its own process group, with the step's
/// working directory and extra environment.
pub(crate) fn build(step: &Step, line: &CommandLine) -> Command {
    let mut cmd = Command::new(&line.program);
    cmd.args(&line.args)
        .envs(&step.env)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    if let Some(ref dir) = step.dir {
        if !dir.as_os_str().is_empty() {
            cmd.current_dir(dir);
        }
    }

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        let cl = split_command(line).unwrap();
        std::iter::once(cl.program).chain(cl.args).collect()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(words("  echo   a\tb "), ["echo", "a", "b"]);
    }

    #[test]
    fn keeps_quoted_words_together() {
        assert_eq!(words(r#"sh -c 'echo "a b"'"#), ["sh", "-c", r#"echo "a b""#]);
        assert_eq!(words(r#"printf "x \"y\" z""#), ["printf", r#"x "y" z"#]);
        assert_eq!(words("echo ''"), ["echo", ""]);
    }

    #[test]
    fn backslash_escapes_outside_quotes() {
        assert_eq!(words(r"echo a\ b"), ["echo", "a b"]);
    }

    #[test]
    fn blank_line_has_no_program() {
        assert!(split_command("   ").is_none());
    }

    #[test]
    fn cmd_is_expanded_at_resolve_time() {
        crate::exec::env::publish_output("DAGNODE_CMD_TEST_WORD", "late");
        let step = Step {
            name: "a".into(),
            cmd: Some("echo $DAGNODE_CMD_TEST_WORD".into()),
            ..Step::default()
        };
        let line = resolve(&step, None).unwrap();
        assert_eq!(line.program, "echo");
        assert_eq!(line.args, ["late"]);
    }

    #[test]
    fn script_path_is_appended_after_args() {
        let step = Step {
            name: "a".into(),
            command: Some("bash".into()),
            args: vec!["-e".into()],
            script: Some("true".into()),
            ..Step::default()
        };
        let line = resolve(&step, Some(Path::new("/tmp/s"))).unwrap();
        assert_eq!(line.program, "bash");
        assert_eq!(line.args, ["-e", "/tmp/s"]);
    }

    #[test]
    fn script_without_command_uses_default_shell() {
        let step = Step {
            name: "a".into(),
            script: Some("true".into()),
            ..Step::default()
        };
        let line = resolve(&step, Some(Path::new("/tmp/s"))).unwrap();
        assert_eq!(line.program, DEFAULT_SHELL);
    }

    #[test]
    fn no_command_is_an_error() {
        let step = Step {
            name: "a".into(),
            ..Step::default()
        };
        assert!(matches!(resolve(&step, None), Err(NodeError::EmptyCommand)));
    }
}
