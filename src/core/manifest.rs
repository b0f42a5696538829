//! `ilcstack.toml` stack file parsing and schema.
//!
//! The stack file lists the modules of one installation in build order:
//!
//! ```toml
//! [install]
//! prefix = "/opt/ilcsoft"
//!
//! [[module]]
//! name = "LCIO"
//! version = "v01-12"
//! mode = "use"
//!
//! [[module]]
//! name = "Marlin"
//! version = "v01-00"
//! without = ["CLHEP"]
//!
//! [module.env]
//! MARLIN_GUI = "1"
//! ```
//!
//! Relative paths are resolved against the directory holding the stack file.
//! A module without `path` lives in `<prefix>/<name>/<version>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::backend::BackendKind;
use crate::core::error::InstallError;
use crate::core::module::{Mode, Module};
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;
use crate::resolver::version::MalformedVersionPolicy;
use crate::util::config::Config;

/// Canonical stack file name.
pub const STACK_FILE_NAME: &str = "ilcstack.toml";

/// Default log file name, next to the stack file.
pub const DEFAULT_LOG_FILE: &str = "ilcstack.log";

/// The `[install]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallSection {
    /// Base directory for module installations
    pub prefix: Option<PathBuf>,

    /// Where build tool output is appended
    pub log_file: Option<PathBuf>,

    /// What to do with unparseable versions
    pub version_policy: Option<MalformedVersionPolicy>,

    /// Backend for modules that do not choose one
    pub backend: Option<BackendKind>,
}

/// One `[[module]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub workdir: Option<PathBuf>,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub backend: Option<BackendKind>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub build_doc: bool,

    #[serde(default)]
    pub rebuild: bool,

    /// Optional modules to build without
    #[serde(default)]
    pub without: Vec<String>,

    /// Plain settings passed to every build tool
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Build flags appended after the module's defaults
    #[serde(default)]
    pub build_env: BTreeMap<String, Vec<String>>,

    /// Build flags replacing whatever earlier writers set
    #[serde(default)]
    pub build_env_override: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStackManifest {
    #[serde(default)]
    install: InstallSection,
    #[serde(default, rename = "module")]
    modules: Vec<ModuleEntry>,
}

/// A parsed stack file.
#[derive(Debug, Clone)]
pub struct StackManifest {
    pub install: InstallSection,
    pub modules: Vec<ModuleEntry>,
    /// Directory containing the stack file
    pub manifest_dir: PathBuf,
}

impl StackManifest {
    /// Load a stack file from a path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stack file: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse stack file content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawStackManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let manifest_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        Ok(StackManifest {
            install: raw.install,
            modules: raw.modules,
            manifest_dir,
        })
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.manifest_dir.join(path)
        }
    }

    /// Base directory for modules without an explicit path.
    pub fn prefix(&self) -> PathBuf {
        match &self.install.prefix {
            Some(prefix) => self.resolve_path(prefix),
            None => self.manifest_dir.clone(),
        }
    }

    /// Log file for build tool output.
    pub fn log_file(&self) -> PathBuf {
        let file = self
            .install
            .log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        self.resolve_path(&file)
    }

    /// Version policy: stack file, then config, then the default.
    pub fn version_policy(&self, config: &Config) -> MalformedVersionPolicy {
        self.install
            .version_policy
            .or_else(|| config.version_policy())
            .unwrap_or_default()
    }

    /// Build the module registry.
    pub fn into_stack(&self, config: &Config) -> Result<Stack, InstallError> {
        let default_backend = self
            .install
            .backend
            .or_else(|| config.backend())
            .unwrap_or_default();

        let mut modules = Vec::with_capacity(self.modules.len());
        for entry in &self.modules {
            modules.push(self.module_from(entry, default_backend)?);
        }
        Stack::new(modules)
    }

    fn module_from(&self, entry: &ModuleEntry, default_backend: BackendKind) -> Result<Module, InstallError> {
        let id = parse_id(&entry.name)?;

        let install_path = match &entry.path {
            Some(path) => self.resolve_path(path),
            None => self.prefix().join(id.as_str()).join(&entry.version),
        };

        let mut disabled = Vec::with_capacity(entry.without.len());
        for name in &entry.without {
            disabled.push(parse_id(name)?);
        }

        let mut module = Module::new(id, install_path, entry.version.clone())
            .with_mode(entry.mode)
            .with_backend(entry.backend.unwrap_or(default_backend))
            .with_debug(entry.debug)
            .with_build_doc(entry.build_doc)
            .with_rebuild(entry.rebuild)
            .with_disabled(disabled);

        if let Some(workdir) = &entry.workdir {
            module = module.with_workdir(self.resolve_path(workdir));
        }
        for (key, value) in &entry.env {
            module = module.with_env(key, value);
        }
        for (name, tokens) in &entry.build_env {
            module.build_env.extend(name, tokens.iter().cloned());
        }
        for (name, tokens) in &entry.build_env_override {
            module.build_env.set_override(name, tokens.iter().cloned());
        }

        Ok(module)
    }
}

fn parse_id(name: &str) -> Result<ModuleId, InstallError> {
    name.parse().map_err(|_| InstallError::UnknownModule {
        name: name.to_string(),
    })
}

/// Find the stack file in `start` or one of its parents.
pub fn find_stack_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(STACK_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STACK: &str = r#"
[install]
prefix = "ilcsoft"
version_policy = "fatal"

[[module]]
name = "LCIO"
version = "v01-12"
path = "/opt/LCIO"
mode = "use"

[[module]]
name = "gear"
version = "v00-08"

[[module]]
name = "Marlin"
version = "v01-00"
backend = "make"
workdir = "work/Marlin"
debug = true
without = ["CLHEP"]

[module.env]
MARLIN_GUI = "1"

[module.build_env]
USERINCLUDES = ["-I/extra/include"]

[module.build_env_override]
CXXFLAGS = ["-O0"]
"#;

    #[test]
    fn test_parse_and_build_stack() {
        let manifest = StackManifest::parse(STACK, Path::new("/srv/stack/ilcstack.toml")).unwrap();
        let stack = manifest.into_stack(&Config::default()).unwrap();

        assert_eq!(stack.ids(), vec![ModuleId::Lcio, ModuleId::Gear, ModuleId::Marlin]);

        let lcio = stack.get(ModuleId::Lcio).unwrap();
        assert_eq!(lcio.install_path, PathBuf::from("/opt/LCIO"));
        assert_eq!(lcio.mode, Mode::Use);

        let gear = stack.get(ModuleId::Gear).unwrap();
        assert_eq!(gear.install_path, PathBuf::from("/srv/stack/ilcsoft/GEAR/v00-08"));
        assert_eq!(gear.backend, BackendKind::CMake);

        let marlin = stack.get(ModuleId::Marlin).unwrap();
        assert_eq!(marlin.backend, BackendKind::Make);
        assert_eq!(marlin.workdir, PathBuf::from("/srv/stack/work/Marlin"));
        assert!(marlin.debug);
        assert!(marlin.flag("MARLIN_GUI"));
        assert_eq!(marlin.disabled, vec![ModuleId::Clhep]);
        assert_eq!(
            marlin.build_env.get("USERINCLUDES"),
            Some(&["-I/extra/include".to_string()][..])
        );

        assert_eq!(manifest.version_policy(&Config::default()), MalformedVersionPolicy::Fatal);
        assert_eq!(manifest.log_file(), PathBuf::from("/srv/stack/ilcstack.log"));
    }

    #[test]
    fn test_unknown_module_is_rejected() {
        let manifest = StackManifest::parse(
            "[[module]]\nname = \"ROOT\"\nversion = \"5.34\"\n",
            Path::new("ilcstack.toml"),
        )
        .unwrap();

        let err = manifest.into_stack(&Config::default()).unwrap_err();
        assert!(matches!(err, InstallError::UnknownModule { name } if name == "ROOT"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = StackManifest::parse(
            "[[module]]\nname = \"LCIO\"\nversion = \"v01\"\nflavour = \"x\"\n",
            Path::new("ilcstack.toml"),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("flavour"));
    }

    #[test]
    fn test_backend_falls_back_to_config() {
        let manifest = StackManifest::parse(
            "[[module]]\nname = \"Marlin\"\nversion = \"v01-00\"\n",
            Path::new("/srv/ilcstack.toml"),
        )
        .unwrap();
        let mut config = Config::default();
        config.install.backend = Some("make".to_string());

        let stack = manifest.into_stack(&config).unwrap();
        assert_eq!(stack.get(ModuleId::Marlin).unwrap().backend, BackendKind::Make);
    }

    #[test]
    fn test_find_stack_file_walks_upward() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(find_stack_file(&nested).is_none());

        std::fs::write(tmp.path().join(STACK_FILE_NAME), "").unwrap();
        assert_eq!(find_stack_file(&nested), Some(tmp.path().join(STACK_FILE_NAME)));
    }
}
