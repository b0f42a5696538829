//! Global context for ilcstack operations.
//!
//! Provides centralized access to the working directory, the stack file and
//! the layered tool configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use thiserror::Error;

use crate::core::manifest::find_stack_file;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};

/// No stack file in the working directory or above.
#[derive(Debug, Error)]
#[error("could not find `ilcstack.toml` in `{}` or any parent directory", .cwd.display())]
pub struct StackFileNotFound {
    pub cwd: PathBuf,
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Stack file given on the command line
    stack_file: Option<PathBuf>,

    /// Global config file (~/.ilcstack/config.toml), if a home exists
    global_config: Option<PathBuf>,

    /// Copy build tool output to the terminal
    verbose: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context rooted at `cwd`.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        GlobalContext {
            cwd: cwd.into(),
            stack_file: None,
            global_config: global_config_path(),
            verbose: false,
        }
    }

    /// Use an explicit stack file instead of searching for one.
    pub fn with_stack_file(mut self, path: Option<PathBuf>) -> Self {
        self.stack_file = path;
        self
    }

    /// Override the global config location.
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Locate the stack file: the explicit one, or the nearest
    /// `ilcstack.toml` in the working directory or above.
    pub fn stack_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.stack_file {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                self.cwd.join(path)
            };
            if !path.is_file() {
                bail!("stack file not found: {}", path.display());
            }
            return Ok(path);
        }

        find_stack_file(&self.cwd).ok_or_else(|| {
            StackFileNotFound {
                cwd: self.cwd.clone(),
            }
            .into()
        })
    }

    /// Tool configuration for a stack rooted at `stack_root`.
    pub fn config(&self, stack_root: &Path) -> Config {
        let project = project_config_path(stack_root);
        match &self.global_config {
            Some(global) => load_config(global, &project),
            None => Config::load_or_default(&project),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::STACK_FILE_NAME;
    use tempfile::TempDir;

    #[test]
    fn test_stack_file_search() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("Marlin/build");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join(STACK_FILE_NAME), "").unwrap();

        let gctx = GlobalContext::with_cwd(&nested);
        assert_eq!(gctx.stack_file().unwrap(), tmp.path().join(STACK_FILE_NAME));
    }

    #[test]
    fn test_explicit_stack_file_must_exist() {
        let tmp = TempDir::new().unwrap();
        let gctx = GlobalContext::with_cwd(tmp.path()).with_stack_file(Some("other.toml".into()));

        let err = gctx.stack_file().unwrap_err();
        assert!(err.to_string().contains("other.toml"));
    }

    #[test]
    fn test_missing_stack_file() {
        let tmp = TempDir::new().unwrap();
        let err = GlobalContext::with_cwd(tmp.path()).stack_file().unwrap_err();
        assert!(err.to_string().contains(STACK_FILE_NAME));
        assert!(err.downcast_ref::<StackFileNotFound>().is_some());
    }

    #[test]
    fn test_project_config_without_global() {
        let tmp = TempDir::new().unwrap();
        let project = project_config_path(tmp.path());
        std::fs::create_dir_all(project.parent().unwrap()).unwrap();
        std::fs::write(&project, "[tools]\nmake = \"gmake\"\n").unwrap();

        let gctx = GlobalContext::with_cwd(tmp.path()).with_global_config(None);
        assert_eq!(gctx.config(tmp.path()).tool_settings().make, "gmake");
    }
}
