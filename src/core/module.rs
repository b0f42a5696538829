//! Runtime state of one module in a stack.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builder::backend::BackendKind;
use crate::core::descriptor::{FileGroup, ModuleDescriptor};
use crate::core::env_store::EnvStore;
use crate::core::error::InstallError;
use crate::core::module_id::ModuleId;
use crate::resolver::version::{evaluate, MalformedVersionPolicy, VersionOrdering};

/// Name of the package link directory inside a module workspace.
pub const LINKS_DIR: &str = "packages";

/// What the installer does with a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Build and install from sources
    #[default]
    Install,
    /// Use an existing installation as-is
    Use,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Install => write!(f, "install"),
            Mode::Use => write!(f, "use"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "install" => Ok(Mode::Install),
            "use" => Ok(Mode::Use),
            _ => Err(format!("invalid mode '{}'; expected 'install' or 'use'", s)),
        }
    }
}

/// Lifecycle of a module during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Declared,
    Initialized,
    Installed,
    Failed,
}

/// A module participating in an installation run.
#[derive(Debug, Clone)]
pub struct Module {
    pub descriptor: ModuleDescriptor,
    pub install_path: PathBuf,
    /// Dedicated build directory, distinct from the installation path when set
    pub workdir: PathBuf,
    pub mode: Mode,
    pub version: String,
    pub backend: BackendKind,
    pub debug: bool,
    pub build_doc: bool,
    pub rebuild: bool,
    /// Optional modules the user switched off explicitly
    pub disabled: Vec<ModuleId>,
    /// Required files; starts from the descriptor, hooks may add groups
    pub required_files: Vec<FileGroup>,
    /// Required modules; starts from the descriptor, hooks may add entries
    pub required: Vec<ModuleId>,
    /// Plain settings exported to every build-tool invocation
    pub env: BTreeMap<String, String>,
    /// Build flags written into generated environment files
    pub build_env: EnvStore,
    pub status: ModuleStatus,
}

impl Module {
    /// Create a module with descriptor defaults.
    pub fn new(id: ModuleId, install_path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        let descriptor = ModuleDescriptor::for_id(id);
        let install_path = install_path.into();
        Module {
            required_files: descriptor.required_files.clone(),
            required: descriptor.required.clone(),
            descriptor,
            workdir: install_path.clone(),
            install_path,
            mode: Mode::Install,
            version: version.into(),
            backend: BackendKind::CMake,
            debug: false,
            build_doc: false,
            rebuild: false,
            disabled: Vec::new(),
            env: BTreeMap::new(),
            build_env: EnvStore::new(),
            status: ModuleStatus::Declared,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_build_doc(mut self, build_doc: bool) -> Self {
        self.build_doc = build_doc;
        self
    }

    pub fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    pub fn with_disabled(mut self, disabled: Vec<ModuleId>) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> ModuleId {
        self.descriptor.id
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.id.as_str()
    }

    /// Directory holding the package links.
    pub fn links_dir(&self) -> PathBuf {
        self.workdir.join(LINKS_DIR)
    }

    /// Whether the installer builds this module in the current run.
    pub fn is_install(&self) -> bool {
        self.mode == Mode::Install
    }

    /// Whether the module finished initialization without failing.
    pub fn is_initialized(&self) -> bool {
        matches!(self.status, ModuleStatus::Initialized | ModuleStatus::Installed)
    }

    pub fn is_installed(&self) -> bool {
        self.status == ModuleStatus::Installed
    }

    /// Value of a plain setting equal to "1".
    pub fn flag(&self, key: &str) -> bool {
        self.env.get(key).map(|v| v.trim() == "1").unwrap_or(false)
    }

    /// Add a required file group unless an identical one is present.
    pub fn require_files(&mut self, group: FileGroup) {
        if !self.required_files.contains(&group) {
            self.required_files.push(group);
        }
    }

    /// Add a required module unless it is already required.
    pub fn require_module(&mut self, id: ModuleId) {
        if !self.required.contains(&id) {
            self.required.push(id);
        }
    }

    /// Required file groups not satisfied below the installation path.
    pub fn missing_files(&self) -> Vec<&FileGroup> {
        missing_in(&self.required_files, &self.install_path)
    }

    /// Compare this module's version against `required`.
    ///
    /// Unparseable versions follow `policy`; the returned flag is true when the
    /// policy had to be applied.
    pub fn evaluate_version(
        &self,
        required: &str,
        policy: MalformedVersionPolicy,
    ) -> Result<(VersionOrdering, bool), InstallError> {
        match evaluate(&self.version, required) {
            Ok(ordering) => Ok((ordering, false)),
            Err(e) => match policy {
                MalformedVersionPolicy::AssumeNewer => Ok((VersionOrdering::Newer, true)),
                MalformedVersionPolicy::Fatal => Err(InstallError::MalformedVersion {
                    module: self.name().to_string(),
                    version: e.version,
                }),
            },
        }
    }
}

fn missing_in<'a>(groups: &'a [FileGroup], root: &Path) -> Vec<&'a FileGroup> {
    groups.iter().filter(|g| !g.is_satisfied(root)).collect()
}
