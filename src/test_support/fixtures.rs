//! Test fixtures for common test scenarios.
//!
//! A [`StackFixture`] owns a temporary directory in which module
//! installations can be laid out, either complete (every required file
//! present) or empty.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::module::Module;
use crate::core::module_id::ModuleId;

/// Temporary root for module installations and stack files.
pub struct StackFixture {
    root: TempDir,
}

impl StackFixture {
    pub fn new() -> Self {
        StackFixture {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Installation path used for `id`.
    pub fn install_path(&self, id: ModuleId) -> PathBuf {
        self.root.path().join(id.as_str())
    }

    /// A module with an empty installation directory.
    pub fn declared(&self, id: ModuleId) -> Module {
        let path = self.install_path(id);
        fs::create_dir_all(&path).unwrap();
        Module::new(id, path, "v01-00")
    }

    /// A module whose installation directory holds every required file.
    pub fn installed(&self, id: ModuleId) -> Module {
        let module = self.declared(id);
        populate(&module);
        module
    }

    /// Write a stack file and return its path.
    pub fn write_stack(&self, contents: &str) -> PathBuf {
        let path = self.root.path().join("ilcstack.toml");
        fs::write(&path, contents).unwrap();
        path
    }
}

impl Default for StackFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the first alternative of every required file group of `module`.
pub fn populate(module: &Module) {
    for group in &module.required_files {
        if let Some(file) = group.alternatives().first() {
            let path = module.install_path.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, "").unwrap();
        }
    }
}
