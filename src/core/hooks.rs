//! Per-module lifecycle hooks.
//!
//! Every module goes through `init`, `pre_check_deps` and `post_check_deps`
//! before anything is built. The default hooks give a module its installation
//! setting and the standard include/library flags; the Marlin framework adds
//! its compatibility gates on top.
//!
//! Hooks receive a private copy of their module and a read-only view of the
//! stack. Changes to other modules are returned as [`EnvPatch`] values and
//! applied by the orchestrator, so no hook ever mutates a sibling directly.

use crate::builder::tool::ToolRunner;
use crate::core::descriptor::{FileGroup, ModuleRole};
use crate::core::env_store::EnvStore;
use crate::core::error::{InstallError, Warning};
use crate::core::module::Module;
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;
use crate::resolver::optional::Resolution;
use crate::resolver::version::{MalformedVersionPolicy, VersionOrdering};

/// Last Marlin release that needs MarlinUtil's include directory spelled out.
pub const MARLIN_LEGACY_INCLUDE_VERSION: &str = "v00-09-06";

/// Oldest QT release usable by the Marlin GUI.
pub const MARLIN_GUI_QT_VERSION: &str = "4.0";

/// Read-only state shared by all hooks.
pub struct HookContext<'a> {
    pub stack: &'a Stack,
    pub policy: MalformedVersionPolicy,
    pub tools: &'a dyn ToolRunner,
    pub doc_tool: &'a str,
}

/// A build-flag token to append to another module's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPatch {
    pub target: ModuleId,
    pub name: String,
    pub token: String,
}

/// Side effects of a hook beyond its own module.
#[derive(Debug, Clone, Default)]
pub struct HookOutcome {
    pub patches: Vec<EnvPatch>,
    pub warnings: Vec<Warning>,
}

/// Lifecycle hooks of one module kind.
pub trait ModuleHooks {
    /// Set up settings and build flags.
    fn init(&self, module: &mut Module, _ctx: &HookContext<'_>) -> Result<HookOutcome, InstallError> {
        default_init(module);
        Ok(HookOutcome::default())
    }

    /// Add requirements that depend on settings, before presence checks.
    fn pre_check_deps(&self, _module: &mut Module, _ctx: &HookContext<'_>) -> Result<(), InstallError> {
        Ok(())
    }

    /// Validate dependencies once optional modules are resolved.
    fn post_check_deps(
        &self,
        _module: &mut Module,
        _resolution: &Resolution,
        _ctx: &HookContext<'_>,
    ) -> Result<HookOutcome, InstallError> {
        Ok(HookOutcome::default())
    }
}

/// Hooks for modules without special behavior.
pub struct DefaultHooks;

impl ModuleHooks for DefaultHooks {}

/// Hooks for the Marlin framework.
pub struct MarlinHooks;

impl ModuleHooks for MarlinHooks {
    fn init(&self, module: &mut Module, ctx: &HookContext<'_>) -> Result<HookOutcome, InstallError> {
        default_init(module);
        let mut outcome = HookOutcome::default();

        module
            .env
            .entry("MARLINWORKDIR".to_string())
            .or_insert_with(|| module.workdir.display().to_string());

        if !module.is_install() {
            return Ok(outcome);
        }

        let (ordering, assumed) =
            module.evaluate_version(MARLIN_LEGACY_INCLUDE_VERSION, ctx.policy)?;
        if assumed {
            outcome.warnings.push(
                Warning::MalformedVersion {
                    module: module.name().to_string(),
                    version: module.version.clone(),
                }
                .emit(),
            );
        }
        if ordering.is_at_most() && module.descriptor.optional.contains(&ModuleId::MarlinUtil) {
            if let Some(util) = ctx.stack.get(ModuleId::MarlinUtil) {
                outcome.patches.push(EnvPatch {
                    target: ModuleId::MarlinUtil,
                    name: "USERINCLUDES".to_string(),
                    token: format!("-I{}/include", util.install_path.display()),
                });
            }
        }

        if module.debug {
            module.env.insert("MARLINDEBUG".to_string(), "1".to_string());
        }

        if module.build_doc && !ctx.tools.on_path(ctx.doc_tool) {
            outcome.warnings.push(
                Warning::ToolUnavailable {
                    module: module.name().to_string(),
                    tool: ctx.doc_tool.to_string(),
                }
                .emit(),
            );
        }

        Ok(outcome)
    }

    fn pre_check_deps(&self, module: &mut Module, _ctx: &HookContext<'_>) -> Result<(), InstallError> {
        if module.is_install() && module.flag("MARLIN_GUI") {
            module.require_module(ModuleId::Qt);
            module.require_files(FileGroup::new(["bin/MarlinGUI"]));
        }
        Ok(())
    }

    fn post_check_deps(
        &self,
        module: &mut Module,
        resolution: &Resolution,
        ctx: &HookContext<'_>,
    ) -> Result<HookOutcome, InstallError> {
        let mut outcome = HookOutcome::default();
        if !module.is_install() {
            return Ok(outcome);
        }

        if module.flag("MARLIN_GUI") {
            if let Some(qt) = ctx.stack.get(ModuleId::Qt) {
                let (ordering, assumed) = qt.evaluate_version(MARLIN_GUI_QT_VERSION, ctx.policy)?;
                if assumed {
                    outcome.warnings.push(
                        Warning::MalformedVersion {
                            module: qt.name().to_string(),
                            version: qt.version.clone(),
                        }
                        .emit(),
                    );
                }
                if ordering == VersionOrdering::Older {
                    return Err(InstallError::IncompatibleVersion {
                        module: module.name().to_string(),
                        dependency: qt.name().to_string(),
                        required: MARLIN_GUI_QT_VERSION.to_string(),
                        found: qt.version.clone(),
                    });
                }
            }
        }

        if resolution.is_included(ModuleId::Raida) || resolution.is_included(ModuleId::AidaJni) {
            module
                .env
                .insert("MARLIN_USE_AIDA".to_string(), "1".to_string());
        }

        Ok(outcome)
    }
}

/// Hooks for a module kind.
pub fn hooks_for(id: ModuleId) -> &'static dyn ModuleHooks {
    match id {
        ModuleId::Marlin => &MarlinHooks,
        _ => &DefaultHooks,
    }
}

/// Installation setting plus standard flags, followed by whatever the stack
/// file contributed.
fn default_init(module: &mut Module) {
    let path = module.install_path.display().to_string();
    module.env.insert(module.id().env_name(), path.clone());

    let user = std::mem::take(&mut module.build_env);
    let mut env = EnvStore::new();
    if module.descriptor.role != ModuleRole::Framework {
        env.append("USERINCLUDES", format!("-I{}/include", path));
        if let Some(lib) = module.descriptor.library {
            env.extend("USERLIBS", [format!("-L{}/lib", path), format!("-l{}", lib)]);
        }
    }
    env.merge(&user);
    module.build_env = env;
}
