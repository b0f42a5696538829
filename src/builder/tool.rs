//! External build tool invocations.
//!
//! The sequencer never spawns processes itself. It describes each step as an
//! [`Invocation`] and hands it to a [`ToolRunner`], which reports a single exit
//! status. Tests substitute a scripted runner.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::sequencer::Step;
use crate::util::process::{append_log_line, find_executable, ProcessBuilder};

/// One external command run on behalf of a build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step: Step,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Settings exported to the child process
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(step: Step, program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Invocation {
            step,
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command line as shown in logs and plans.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn to_process(&self) -> ProcessBuilder {
        let mut builder = ProcessBuilder::new(&self.program)
            .args(&self.args)
            .cwd(&self.cwd);
        for (key, value) in &self.env {
            builder = builder.env(key, value);
        }
        builder
    }
}

/// Exit status of a finished invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl ToolStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external build tools.
pub trait ToolRunner {
    /// Whether `tool` can be found in PATH.
    fn on_path(&self, tool: &str) -> bool;

    /// Run an invocation to completion.
    fn run(&mut self, invocation: &Invocation) -> Result<ToolStatus>;

    /// Where tool output ends up.
    fn log_file(&self) -> &Path;
}

/// Runs tools as child processes, appending their output to a log file.
pub struct SystemRunner {
    log_file: PathBuf,
    echo: bool,
}

impl SystemRunner {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        SystemRunner {
            log_file: log_file.into(),
            echo: false,
        }
    }

    /// Also copy tool output to the terminal.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

impl ToolRunner for SystemRunner {
    fn on_path(&self, tool: &str) -> bool {
        find_executable(tool).is_some()
    }

    fn run(&mut self, invocation: &Invocation) -> Result<ToolStatus> {
        let line = format!(
            "==> [{}] {} (in {})",
            invocation.step,
            invocation.display_command(),
            invocation.cwd.display()
        );
        tracing::debug!("{}", line);
        append_log_line(&self.log_file, &line)?;

        let status = invocation
            .to_process()
            .exec_logged(&self.log_file, self.echo)?;
        Ok(ToolStatus {
            code: status.code(),
        })
    }

    fn log_file(&self) -> &Path {
        &self.log_file
    }
}
