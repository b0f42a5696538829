//! Build backends.
//!
//! A backend turns a module plus its resolved dependencies into the external
//! commands of each build step. The CMake backend configures an out-of-source
//! build directory and installs from it; the legacy Make backend builds in
//! place and relies on the generated environment files instead of configure
//! flags.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builder::sequencer::Step;
use crate::builder::tool::Invocation;
use crate::core::descriptor::{FileGroup, ModuleRole};
use crate::core::module::Module;
use crate::resolver::optional::Resolution;

/// Which backend builds a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    CMake,
    Make,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::CMake => write!(f, "cmake"),
            BackendKind::Make => write!(f, "make"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cmake" => Ok(BackendKind::CMake),
            "make" => Ok(BackendKind::Make),
            _ => Err(format!("invalid backend '{}'; expected 'cmake' or 'make'", s)),
        }
    }
}

/// External programs used by the backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub make: String,
    pub cmake: String,
    pub doxygen: String,
    /// Extra arguments appended to every CMake configure command
    pub cmake_args: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        ToolSettings {
            make: "make".to_string(),
            cmake: "cmake".to_string(),
            doxygen: "doxygen".to_string(),
            cmake_args: Vec::new(),
        }
    }
}

/// How a rebuild discards previous build state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanAction {
    /// Delete a cache file
    RemoveCache(PathBuf),
    /// Run a clean target
    Run(Invocation),
}

/// Command generation for one backend.
pub trait BuildBackend {
    /// Required files this backend adds to a module.
    fn extra_required_files(&self, module: &Module) -> Vec<FileGroup>;

    /// Configure command; `deps` are the active dependencies in stack order.
    fn configure(&self, module: &Module, deps: &[&Module], resolution: &Resolution) -> Option<Invocation>;

    fn compile(&self, module: &Module) -> Invocation;

    fn install(&self, module: &Module) -> Option<Invocation>;

    fn clean(&self, module: &Module) -> CleanAction;

    /// Documentation target, run in the module workspace.
    fn document(&self, module: &Module) -> Invocation;

    /// Whether every package in the stack must be linked before building
    /// documentation.
    fn links_all_packages_for_doc(&self) -> bool;

    /// Program that must be on PATH for the build steps.
    fn required_tools(&self) -> Vec<&str>;

    /// Extension of the generated environment files. Both backends drive
    /// make, so both include makefile fragments.
    fn env_file_extension(&self) -> &'static str {
        "gmk"
    }
}

/// Select the backend for a module.
pub fn backend_for(kind: BackendKind, tools: &ToolSettings) -> Box<dyn BuildBackend> {
    match kind {
        BackendKind::CMake => Box::new(CMakeBackend::new(tools.clone())),
        BackendKind::Make => Box::new(MakeBackend::new(tools.clone())),
    }
}

/// Out-of-source CMake builds in `<install>/build`.
pub struct CMakeBackend {
    tools: ToolSettings,
}

impl CMakeBackend {
    pub fn new(tools: ToolSettings) -> Self {
        CMakeBackend { tools }
    }

    pub fn build_dir(module: &Module) -> PathBuf {
        module.install_path.join("build")
    }
}

impl BuildBackend for CMakeBackend {
    fn extra_required_files(&self, _module: &Module) -> Vec<FileGroup> {
        Vec::new()
    }

    fn configure(&self, module: &Module, deps: &[&Module], resolution: &Resolution) -> Option<Invocation> {
        let build_type = if module.debug { "Debug" } else { "RelWithDebInfo" };
        let mut inv = Invocation::new(Step::Configure, &self.tools.cmake, Self::build_dir(module))
            .arg(format!("-DCMAKE_INSTALL_PREFIX={}", module.install_path.display()))
            .arg(format!("-DCMAKE_BUILD_TYPE={}", build_type));

        for dep in deps {
            inv = inv.arg(format!(
                "-D{}_HOME={}",
                dep.id().env_name(),
                dep.install_path.display()
            ));
        }

        // CMake probes for every candidate on its own, so each one gets an
        // explicit switch.
        for &id in &resolution.included {
            if module.descriptor.is_build_with(id) {
                inv = inv.arg(format!("-DBUILD_WITH_{}=ON", id.env_name()));
            }
        }
        for id in resolution.build_without(module) {
            inv = inv.arg(format!("-DBUILD_WITH_{}=OFF", id.env_name()));
        }

        Some(inv.args(self.tools.cmake_args.iter().cloned()).arg(".."))
    }

    fn compile(&self, module: &Module) -> Invocation {
        Invocation::new(Step::Compile, &self.tools.make, Self::build_dir(module))
    }

    fn install(&self, module: &Module) -> Option<Invocation> {
        Some(Invocation::new(Step::Install, &self.tools.make, Self::build_dir(module)).arg("install"))
    }

    fn clean(&self, module: &Module) -> CleanAction {
        CleanAction::RemoveCache(Self::build_dir(module).join("CMakeCache.txt"))
    }

    fn document(&self, module: &Module) -> Invocation {
        Invocation::new(Step::Document, &self.tools.make, &module.workdir).arg("doc")
    }

    fn links_all_packages_for_doc(&self) -> bool {
        true
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.tools.cmake.as_str(), self.tools.make.as_str()]
    }
}

/// In-place builds driven by the generated environment files.
pub struct MakeBackend {
    tools: ToolSettings,
}

impl MakeBackend {
    pub fn new(tools: ToolSettings) -> Self {
        MakeBackend { tools }
    }
}

impl BuildBackend for MakeBackend {
    fn extra_required_files(&self, module: &Module) -> Vec<FileGroup> {
        if module.descriptor.role != ModuleRole::Framework {
            return Vec::new();
        }
        let name = module.name().to_lowercase();
        vec![
            FileGroup::new([format!("bin/{}_libs.sh", name)]),
            FileGroup::new([format!("bin/{}_includes.sh", name)]),
        ]
    }

    fn configure(&self, _module: &Module, _deps: &[&Module], _resolution: &Resolution) -> Option<Invocation> {
        None
    }

    fn compile(&self, module: &Module) -> Invocation {
        Invocation::new(Step::Compile, &self.tools.make, &module.install_path)
    }

    fn install(&self, _module: &Module) -> Option<Invocation> {
        None
    }

    fn clean(&self, module: &Module) -> CleanAction {
        CleanAction::Run(Invocation::new(Step::Clean, &self.tools.make, &module.install_path).arg("clean"))
    }

    fn document(&self, module: &Module) -> Invocation {
        Invocation::new(Step::Document, &self.tools.make, &module.workdir).arg("doc")
    }

    fn links_all_packages_for_doc(&self) -> bool {
        false
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.tools.make.as_str()]
    }
}
