//! Fatal errors and non-fatal warnings of an installation run.
//!
//! Fatal errors stop the run for the failing module and everything that
//! depends on it. Warnings travel in a separate channel: they are collected in
//! reports, logged, and never change control flow.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::builder::sequencer::Step;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A fatal installation error.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum InstallError {
    #[error("`{module}` requires `{dependency}`, which is not installed")]
    #[diagnostic(
        code(ilcstack::deps::missing),
        help("add the dependency to the stack file above the module that needs it")
    )]
    DependencyMissing { module: String, dependency: String },

    #[error("malformed version `{version}` for `{module}`")]
    #[diagnostic(
        code(ilcstack::version::malformed),
        help("use a release like v01-02-03 or 1.2.3, or set the version policy to assume-newer")
    )]
    MalformedVersion { module: String, version: String },

    #[error("`{module}` needs `{dependency}` {required} or newer, found {found}")]
    #[diagnostic(code(ilcstack::version::incompatible))]
    IncompatibleVersion {
        module: String,
        dependency: String,
        required: String,
        found: String,
    },

    #[error("failed to write environment file {}", .path.display())]
    #[diagnostic(code(ilcstack::env::write_failed))]
    EnvironmentWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{module}: {reason}")]
    #[diagnostic(code(ilcstack::build::step_failed))]
    BuildStepFailed {
        module: String,
        step: Step,
        reason: String,
        log: PathBuf,
    },

    #[error("`{tool}` was not found in PATH (needed to {step} `{module}`)")]
    #[diagnostic(code(ilcstack::build::tool_unavailable))]
    ToolUnavailable {
        module: String,
        tool: String,
        step: Step,
    },

    #[error("failed to link package at {}", .path.display())]
    #[diagnostic(code(ilcstack::link::failed))]
    LinkFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown module `{name}`")]
    #[diagnostic(code(ilcstack::stack::unknown_module))]
    UnknownModule { name: String },

    #[error("module `{name}` is listed more than once")]
    #[diagnostic(code(ilcstack::stack::duplicate_module))]
    DuplicateModule { name: String },

    #[error("`{module}` is listed before its dependency `{dependency}`")]
    #[diagnostic(
        code(ilcstack::stack::order),
        help("list every dependency above the modules that need it")
    )]
    OrderViolation { module: String, dependency: String },
}

impl InstallError {
    /// The step a build failure happened in, if any.
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            InstallError::BuildStepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            InstallError::DependencyMissing { dependency, .. } => diag
                .with_suggestion(format!("Add `{}` to the stack file", dependency))
                .with_suggestion(format!(
                    "Or set `mode = \"use\"` for an existing `{}` installation",
                    dependency
                )),
            InstallError::BuildStepFailed { log, .. } => diag
                .with_location(log.clone())
                .with_suggestion("Inspect the build log for the first compiler error")
                .with_suggestion(suggestions::BUILD_FAILED),
            InstallError::UnknownModule { .. } => diag.with_suggestion(suggestions::MODULE_NOT_IN_STACK),
            InstallError::EnvironmentWriteFailed { source, .. }
            | InstallError::LinkFailed { source, .. } => diag.with_context(source.to_string()),
            InstallError::OrderViolation { dependency, .. } => diag
                .with_suggestion(format!("List `{}` earlier in the stack file", dependency)),
            _ => diag,
        }
    }
}

/// A non-fatal problem. The run continues with degraded behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    /// An entry in the link directory is not a symlink and was left alone
    LinkCollision { module: String, path: PathBuf },
    /// An optional tool is missing; the step was skipped
    ToolUnavailable { module: String, tool: String },
    /// A version could not be parsed and was assumed to be newer
    MalformedVersion { module: String, version: String },
    /// A module in `use` mode lacks required files
    MissingFiles { module: String, files: Vec<String> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LinkCollision { module, path } => write!(
                f,
                "{}: [ {} ] is NOT a symbolic link, it is used instead of the configured package",
                module,
                path.display()
            ),
            Warning::ToolUnavailable { module, tool } => write!(
                f,
                "{}: {} was not found, documentation will not be built",
                module, tool
            ),
            Warning::MalformedVersion { module, version } => write!(
                f,
                "{}: cannot parse version `{}`, assuming it is newer than any requirement",
                module, version
            ),
            Warning::MissingFiles { module, files } => {
                write!(f, "{}: missing required files: {}", module, files.join(", "))
            }
        }
    }
}

impl Warning {
    /// Log the warning and return it, for use in collecting chains.
    pub fn emit(self) -> Self {
        tracing::warn!("{}", self);
        self
    }
}
