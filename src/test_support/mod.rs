//! Test utilities and mocks for ilcstack unit tests.
//!
//! The main piece is [`MockToolRunner`], which records every invocation and
//! returns scripted exit statuses instead of spawning build tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use ilcstack::test_support::{MockToolRunner, StackFixture};
//!
//! #[test]
//! fn test_example() {
//!     let fx = StackFixture::new();
//!     let lcio = fx.installed(ModuleId::Lcio);
//!
//!     let mut runner = MockToolRunner::new().fail_at(Step::Compile, 2);
//!     // Run a sequence, then inspect runner.steps()...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::sequencer::Step;
use crate::builder::tool::{Invocation, ToolRunner, ToolStatus};

pub use fixtures::*;

/// Scripted stand-in for the system tool runner.
#[derive(Debug, Clone)]
pub struct MockToolRunner {
    /// Every invocation, in order
    pub invocations: Vec<Invocation>,
    failures: Vec<(Step, i32)>,
    spawn_errors: Vec<Step>,
    missing: Vec<String>,
    log_file: PathBuf,
}

impl MockToolRunner {
    /// All tools available, every invocation succeeds.
    pub fn new() -> Self {
        MockToolRunner {
            invocations: Vec::new(),
            failures: Vec::new(),
            spawn_errors: Vec::new(),
            missing: Vec::new(),
            log_file: PathBuf::from("/tmp/ilcstack-test.log"),
        }
    }

    /// Exit with `code` when running `step`.
    pub fn fail_at(mut self, step: Step, code: i32) -> Self {
        self.failures.push((step, code));
        self
    }

    /// Fail to start the tool of `step`.
    pub fn spawn_error_at(mut self, step: Step) -> Self {
        self.spawn_errors.push(step);
        self
    }

    /// Pretend `tool` is not in PATH.
    pub fn without_tool(mut self, tool: &str) -> Self {
        self.missing.push(tool.to_string());
        self
    }

    /// Steps of the recorded invocations.
    pub fn steps(&self) -> Vec<Step> {
        self.invocations.iter().map(|i| i.step).collect()
    }

    /// Recorded command lines.
    pub fn commands(&self) -> Vec<String> {
        self.invocations.iter().map(|i| i.display_command()).collect()
    }
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for MockToolRunner {
    fn on_path(&self, tool: &str) -> bool {
        !self.missing.iter().any(|m| m == tool)
    }

    fn run(&mut self, invocation: &Invocation) -> Result<ToolStatus> {
        self.invocations.push(invocation.clone());
        if self.spawn_errors.contains(&invocation.step) {
            bail!("failed to spawn `{}`", invocation.program);
        }
        let code = self
            .failures
            .iter()
            .find(|(step, _)| *step == invocation.step)
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(ToolStatus { code: Some(code) })
    }

    fn log_file(&self) -> &Path {
        &self.log_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_scripts_failures() {
        let mut runner = MockToolRunner::new().fail_at(Step::Install, 2).without_tool("doxygen");

        let compile = Invocation::new(Step::Compile, "make", "/tmp");
        let install = Invocation::new(Step::Install, "make", "/tmp").arg("install");

        assert!(runner.run(&compile).unwrap().success());
        assert_eq!(runner.run(&install).unwrap().code, Some(2));
        assert!(!runner.on_path("doxygen"));
        assert!(runner.on_path("make"));
        assert_eq!(runner.commands(), vec!["make", "make install"]);
    }
}
