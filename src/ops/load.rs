//! Loading a stack file together with its configuration.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::backend::ToolSettings;
use crate::core::manifest::StackManifest;
use crate::core::stack::Stack;
use crate::resolver::version::MalformedVersionPolicy;
use crate::util::config::Config;
use crate::util::context::GlobalContext;

/// Settings that apply to a whole run.
#[derive(Debug, Clone)]
pub struct StackSettings {
    pub policy: MalformedVersionPolicy,
    pub tools: ToolSettings,
    /// Build tool output is appended here
    pub log_file: PathBuf,
    /// Copy build tool output to the terminal as well
    pub echo: bool,
}

impl StackSettings {
    /// Settings for tests and callers without a stack file.
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        StackSettings {
            policy: MalformedVersionPolicy::default(),
            tools: ToolSettings::default(),
            log_file: log_file.into(),
            echo: false,
        }
    }
}

/// A stack file turned into a module registry.
#[derive(Debug, Clone)]
pub struct LoadedStack {
    pub path: PathBuf,
    pub stack: Stack,
    pub settings: StackSettings,
}

impl LoadedStack {
    /// Directory holding the stack file.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

/// Find, parse and resolve the stack file of `gctx`.
pub fn load_stack(gctx: &GlobalContext) -> Result<LoadedStack> {
    let path = gctx.stack_file()?;
    let manifest = StackManifest::load(&path)?;
    let config = gctx.config(&manifest.manifest_dir);

    let stack = manifest.into_stack(&config)?;
    let settings = settings_for(&manifest, &config, gctx.is_verbose());

    tracing::debug!("loaded {} modules from {}", stack.len(), path.display());

    Ok(LoadedStack {
        path,
        stack,
        settings,
    })
}

fn settings_for(manifest: &StackManifest, config: &Config, verbose: bool) -> StackSettings {
    StackSettings {
        policy: manifest.version_policy(config),
        tools: config.tool_settings(),
        log_file: manifest.log_file(),
        echo: verbose || config.install.echo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module_id::ModuleId;
    use crate::test_support::StackFixture;

    #[test]
    fn test_load_stack() {
        let fx = StackFixture::new();
        fx.write_stack(
            r#"
[install]
log_file = "logs/install.log"

[[module]]
name = "LCIO"
version = "v01-12"
mode = "use"
"#,
        );

        let gctx = GlobalContext::with_cwd(fx.path()).with_global_config(None);
        let loaded = load_stack(&gctx).unwrap();

        assert_eq!(loaded.stack.ids(), vec![ModuleId::Lcio]);
        assert_eq!(loaded.root(), fx.path());
        assert_eq!(loaded.settings.log_file, fx.path().join("logs/install.log"));
        assert_eq!(loaded.settings.policy, MalformedVersionPolicy::AssumeNewer);
        assert!(!loaded.settings.echo);
    }

    #[test]
    fn test_unknown_module_surfaces_install_error() {
        let fx = StackFixture::new();
        fx.write_stack("[[module]]\nname = \"Geant4\"\nversion = \"10.1\"\n");

        let gctx = GlobalContext::with_cwd(fx.path()).with_global_config(None);
        let err = load_stack(&gctx).unwrap_err();
        assert!(err.downcast_ref::<crate::core::error::InstallError>().is_some());
    }
}
