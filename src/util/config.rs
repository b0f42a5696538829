//! Configuration file support for ilcstack.
//!
//! ilcstack supports two configuration file locations:
//! - Global: `~/.ilcstack/config.toml` - User-wide defaults
//! - Project: `.ilcstack/config.toml` next to the stack file - Project-specific overrides
//!
//! Project config takes precedence over global config. Settings in the stack
//! file itself take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::backend::{BackendKind, ToolSettings};
use crate::resolver::version::MalformedVersionPolicy;

/// ilcstack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External build tools
    pub tools: ToolsConfig,

    /// Installation defaults
    pub install: InstallConfig,
}

/// External tool overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Make program (e.g., gmake)
    pub make: Option<String>,

    /// CMake program (e.g., /opt/cmake/bin/cmake)
    pub cmake: Option<String>,

    /// Documentation generator
    pub doxygen: Option<String>,

    /// Extra arguments for every CMake configure command
    pub cmake_args: Vec<String>,
}

/// Defaults applied to every stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Default backend for modules that do not choose one (cmake, make)
    pub backend: Option<String>,

    /// What to do with unparseable versions (assume-newer, fatal)
    pub version_policy: Option<String>,

    /// Copy build tool output to the terminal
    pub echo: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.make.is_some() {
            self.tools.make = other.tools.make;
        }
        if other.tools.cmake.is_some() {
            self.tools.cmake = other.tools.cmake;
        }
        if other.tools.doxygen.is_some() {
            self.tools.doxygen = other.tools.doxygen;
        }
        if !other.tools.cmake_args.is_empty() {
            self.tools.cmake_args = other.tools.cmake_args;
        }

        if other.install.backend.is_some() {
            self.install.backend = other.install.backend;
        }
        if other.install.version_policy.is_some() {
            self.install.version_policy = other.install.version_policy;
        }
        if other.install.echo {
            self.install.echo = true;
        }
    }

    /// Tool settings with defaults filled in.
    pub fn tool_settings(&self) -> ToolSettings {
        let defaults = ToolSettings::default();
        ToolSettings {
            make: self.tools.make.clone().unwrap_or(defaults.make),
            cmake: self.tools.cmake.clone().unwrap_or(defaults.cmake),
            doxygen: self.tools.doxygen.clone().unwrap_or(defaults.doxygen),
            cmake_args: self.tools.cmake_args.clone(),
        }
    }

    /// Parse backend from config string.
    pub fn backend(&self) -> Option<BackendKind> {
        self.install.backend.as_ref().and_then(|s| s.parse().ok())
    }

    /// Parse the malformed-version policy from config string.
    pub fn version_policy(&self) -> Option<MalformedVersionPolicy> {
        self.install.version_policy.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ilcstack/config.toml)
/// 2. Global config (~/.ilcstack/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global ilcstack config directory (~/.ilcstack).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ilcstack"))
}

/// Get the global config path (~/.ilcstack/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.ilcstack/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ilcstack").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.backend().is_none());
        assert!(config.version_policy().is_none());
        assert_eq!(config.tool_settings(), ToolSettings::default());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[tools]
make = "gmake"
cmake_args = ["-DCMAKE_CXX_STANDARD=17"]

[install]
backend = "make"
version_policy = "fatal"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.backend(), Some(BackendKind::Make));
        assert_eq!(config.version_policy(), Some(MalformedVersionPolicy::Fatal));

        let tools = config.tool_settings();
        assert_eq!(tools.make, "gmake");
        assert_eq!(tools.cmake, "cmake");
        assert_eq!(tools.cmake_args, vec!["-DCMAKE_CXX_STANDARD=17"]);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.tools.make = Some("gmake".to_string());
        base.tools.cmake = Some("/usr/bin/cmake".to_string());

        let mut override_cfg = Config::default();
        override_cfg.tools.cmake = Some("/opt/cmake/bin/cmake".to_string());

        base.merge(override_cfg);

        assert_eq!(base.tools.cmake.as_deref(), Some("/opt/cmake/bin/cmake"));
        assert_eq!(base.tools.make.as_deref(), Some("gmake")); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[tools]
doxygen = "/usr/bin/doxygen"

[install]
backend = "make"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[install]
backend = "cmake"
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);

        assert_eq!(config.backend(), Some(BackendKind::CMake));
        assert_eq!(config.tool_settings().doxygen, "/usr/bin/doxygen");
    }

    #[test]
    fn test_broken_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[tools\nmake = ").unwrap();

        let config = Config::load_or_default(&path);
        assert!(config.tools.make.is_none());
    }
}
