use std::path::Path;

use dagnode::config::{Condition, RetryPolicy, Step};

/// Builder for `Step` to simplify test setup.
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    /// A step running the unsplit command line `cmd`.
    pub fn cmd(name: &str, cmd: &str) -> Self {
        Self {
            step: Step {
                name: name.to_string(),
                cmd: Some(cmd.to_string()),
                ..Step::default()
            },
        }
    }

    /// A step running `command` with pre-split `args`.
    pub fn command(name: &str, command: &str, args: &[&str]) -> Self {
        Self {
            step: Step {
                name: name.to_string(),
                command: Some(command.to_string()),
                args: args.iter().map(|a| a.to_string()).collect(),
                ..Step::default()
            },
        }
    }

    /// A `sh` step whose body is an inline script.
    pub fn script(name: &str, body: &str) -> Self {
        Self {
            step: Step {
                name: name.to_string(),
                command: Some("sh".to_string()),
                script: Some(body.to_string()),
                ..Step::default()
            },
        }
    }

    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.step.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.step.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn stdout(mut self, path: impl AsRef<Path>) -> Self {
        self.step.stdout = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn output(mut self, var: &str) -> Self {
        self.step.output = Some(var.to_string());
        self
    }

    pub fn precondition(mut self, condition: &str, expected: &str) -> Self {
        self.step.preconditions.push(Condition {
            condition: condition.to_string(),
            expected: expected.to_string(),
        });
        self
    }

    pub fn retry(mut self, limit: u32, interval_ms: u64) -> Self {
        self.step.retry = RetryPolicy { limit, interval_ms };
        self
    }

    pub fn build(self) -> Step {
        self.step
    }
}
