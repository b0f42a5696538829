//! Initialization of every module before anything is built.
//!
//! Modules are visited in stack order, once per phase. First every module runs
//! its `init` hook and gets the required files of its backend. Then each runs
//! `pre_check_deps` and passes the dependency gate. Last, optional modules are
//! resolved and `post_check_deps` runs. The first fatal error aborts the run.

use std::collections::BTreeMap;

use crate::builder::backend::backend_for;
use crate::builder::tool::ToolRunner;
use crate::core::dependency::DependencyGraph;
use crate::core::error::{InstallError, Warning};
use crate::core::hooks::{hooks_for, EnvPatch, HookContext, ModuleHooks};
use crate::core::module::{Module, ModuleStatus};
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;
use crate::ops::load::StackSettings;
use crate::resolver::optional::{resolve, Resolution};

/// A stack whose modules are all initialized.
#[derive(Debug, Clone)]
pub struct PreparedStack {
    pub stack: Stack,
    resolutions: BTreeMap<ModuleId, Resolution>,
    /// Warnings raised by hooks
    pub warnings: Vec<Warning>,
}

impl PreparedStack {
    /// Optional-module resolution of `id`.
    pub fn resolution(&self, id: ModuleId) -> Option<&Resolution> {
        self.resolutions.get(&id)
    }

    /// Look up a module of the stack, or fail with `UnknownModule`.
    pub fn module(&self, id: ModuleId) -> Result<&Module, InstallError> {
        self.stack.get(id).ok_or_else(|| InstallError::UnknownModule {
            name: id.to_string(),
        })
    }

    /// A module together with its resolution.
    pub fn resolved(&self, id: ModuleId) -> Result<(&Module, &Resolution), InstallError> {
        let module = self.module(id)?;
        let resolution = self.resolution(id).ok_or_else(|| InstallError::UnknownModule {
            name: id.to_string(),
        })?;
        Ok((module, resolution))
    }
}

/// Initialize every module of `stack`.
///
/// Runs in three passes over the stack so that resolution sees the final
/// state of every module, including those listed after the consumer.
pub fn prepare(
    mut stack: Stack,
    settings: &StackSettings,
    tools: &dyn ToolRunner,
) -> Result<PreparedStack, InstallError> {
    DependencyGraph::from_stack(&stack).check_order(&stack)?;

    let mut warnings = Vec::new();

    // init
    for id in stack.ids() {
        let (module, outcome) = with_hooks(&stack, id, settings, tools, |hooks, module, ctx| {
            let outcome = hooks.init(module, ctx)?;
            let backend = backend_for(module.backend, &settings.tools);
            for group in backend.extra_required_files(module) {
                module.require_files(group);
            }
            module.status = ModuleStatus::Initialized;
            Ok(outcome)
        })?;
        store(&mut stack, module);
        apply_patches(&mut stack, outcome.patches);
        warnings.extend(outcome.warnings);
    }

    // required modules
    for id in stack.ids() {
        let (module, ()) = with_hooks(&stack, id, settings, tools, |hooks, module, ctx| {
            hooks.pre_check_deps(module, ctx)?;
            check_required(module, ctx.stack)
        })?;
        store(&mut stack, module);
    }

    // optional modules
    let mut resolutions = BTreeMap::new();
    for id in stack.ids() {
        let (module, (resolution, outcome)) =
            with_hooks(&stack, id, settings, tools, |hooks, module, ctx| {
                let resolution = resolve(module, ctx.stack);
                let outcome = hooks.post_check_deps(module, &resolution, ctx)?;
                Ok((resolution, outcome))
            })?;
        tracing::debug!(
            "{}: with [{}], without [{}]",
            module.name(),
            join_ids(&resolution.included),
            join_ids(&resolution.excluded_ids())
        );
        store(&mut stack, module);
        apply_patches(&mut stack, outcome.patches);
        warnings.extend(outcome.warnings);
        resolutions.insert(id, resolution);
    }

    Ok(PreparedStack {
        stack,
        resolutions,
        warnings,
    })
}

/// Run `f` on a private copy of module `id` with the stack as context.
fn with_hooks<T>(
    stack: &Stack,
    id: ModuleId,
    settings: &StackSettings,
    tools: &dyn ToolRunner,
    f: impl FnOnce(&dyn ModuleHooks, &mut Module, &HookContext<'_>) -> Result<T, InstallError>,
) -> Result<(Module, T), InstallError> {
    let mut module = stack
        .get(id)
        .cloned()
        .ok_or_else(|| InstallError::UnknownModule {
            name: id.to_string(),
        })?;
    let ctx = HookContext {
        stack,
        policy: settings.policy,
        tools,
        doc_tool: &settings.tools.doxygen,
    };
    let value = f(hooks_for(id), &mut module, &ctx)?;
    Ok((module, value))
}

fn store(stack: &mut Stack, module: Module) {
    if let Some(slot) = stack.get_mut(module.id()) {
        *slot = module;
    }
}

fn join_ids(ids: &[ModuleId]) -> String {
    ids.iter().map(ModuleId::as_str).collect::<Vec<_>>().join(", ")
}

/// Every required module must be present, listed earlier, and initialized.
fn check_required(module: &Module, stack: &Stack) -> Result<(), InstallError> {
    for &dep in &module.required {
        match stack.get(dep) {
            Some(provider) if stack.position(dep) > stack.position(module.id()) => {
                return Err(InstallError::OrderViolation {
                    module: module.name().to_string(),
                    dependency: provider.name().to_string(),
                });
            }
            Some(provider) if provider.is_initialized() => {}
            _ => {
                return Err(InstallError::DependencyMissing {
                    module: module.name().to_string(),
                    dependency: dep.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn apply_patches(stack: &mut Stack, patches: Vec<EnvPatch>) {
    for patch in patches {
        if let Some(target) = stack.get_mut(patch.target) {
            tracing::debug!("{}: {} += {}", target.name(), patch.name, patch.token);
            target.build_env.append(&patch.name, patch.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::FileGroup;
    use crate::core::module::Mode;
    use crate::test_support::MockToolRunner;

    fn settings() -> StackSettings {
        StackSettings::new("/tmp/ilcstack-test.log")
    }

    fn module(id: ModuleId) -> Module {
        Module::new(id, format!("/opt/{}", id), "v01-00")
    }

    #[test]
    fn test_missing_required_module() {
        let stack = Stack::new(vec![module(ModuleId::Marlin)]).unwrap();
        let err = prepare(stack, &settings(), &MockToolRunner::new()).unwrap_err();

        assert!(matches!(
            err,
            InstallError::DependencyMissing { ref module, ref dependency }
                if module == "Marlin" && dependency == "LCIO"
        ));
    }

    #[test]
    fn test_order_violation() {
        let stack = Stack::new(vec![module(ModuleId::Marlin), module(ModuleId::Lcio)]).unwrap();
        let err = prepare(stack, &settings(), &MockToolRunner::new()).unwrap_err();
        assert!(matches!(err, InstallError::OrderViolation { .. }));
    }

    #[test]
    fn test_prepare_initializes_and_resolves() {
        let stack = Stack::new(vec![
            module(ModuleId::Lcio),
            module(ModuleId::Gear),
            module(ModuleId::Marlin).with_disabled(vec![ModuleId::Gear]),
        ])
        .unwrap();

        let prepared = prepare(stack, &settings(), &MockToolRunner::new()).unwrap();

        assert!(prepared.stack.iter().all(|m| m.status == ModuleStatus::Initialized));
        let resolution = prepared.resolution(ModuleId::Marlin).unwrap();
        assert!(resolution.is_excluded(ModuleId::Gear));
        assert_eq!(
            prepared.module(ModuleId::Lcio).unwrap().env.get("LCIO").map(String::as_str),
            Some("/opt/LCIO")
        );
    }

    #[test]
    fn test_patches_reach_later_module() {
        let stack = Stack::new(vec![
            module(ModuleId::Lcio),
            Module::new(ModuleId::Marlin, "/opt/Marlin", "v00-09-06"),
            module(ModuleId::MarlinUtil),
        ])
        .unwrap();

        let prepared = prepare(stack, &settings(), &MockToolRunner::new()).unwrap();
        let util = prepared.module(ModuleId::MarlinUtil).unwrap();
        let includes = util.build_env.get("USERINCLUDES").unwrap();
        assert_eq!(
            includes.iter().filter(|t| *t == "-I/opt/MarlinUtil/include").count(),
            2
        );
    }

    #[test]
    fn test_gui_requires_qt() {
        let stack = Stack::new(vec![
            module(ModuleId::Lcio),
            module(ModuleId::Marlin).with_env("MARLIN_GUI", "1"),
        ])
        .unwrap();

        let err = prepare(stack, &settings(), &MockToolRunner::new()).unwrap_err();
        assert!(matches!(err, InstallError::DependencyMissing { ref dependency, .. } if dependency == "QT"));
    }

    #[test]
    fn test_make_backend_adds_scripts() {
        let stack = Stack::new(vec![
            module(ModuleId::Lcio).with_mode(Mode::Use),
            module(ModuleId::Marlin).with_backend(crate::builder::backend::BackendKind::Make),
        ])
        .unwrap();

        let prepared = prepare(stack, &settings(), &MockToolRunner::new()).unwrap();
        let marlin = prepared.module(ModuleId::Marlin).unwrap();
        assert!(marlin
            .required_files
            .contains(&FileGroup::new(["bin/marlin_libs.sh"])));
    }
}
