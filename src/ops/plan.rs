//! Implementation of `ilcstack plan`.
//!
//! Shows what `install` would do for one module: the optional modules it
//! builds with and without, and every step with its command line.

use std::fmt::Write;
use std::path::PathBuf;

use crate::builder::backend::{backend_for, BackendKind};
use crate::builder::compose::ComposedEnvironment;
use crate::builder::sequencer::{BuildSequencer, PlannedAction, PlannedStep};
use crate::core::error::InstallError;
use crate::core::module_id::ModuleId;
use crate::ops::load::StackSettings;
use crate::ops::prepare::PreparedStack;
use crate::resolver::optional::Resolution;

/// Planned build of one module.
#[derive(Debug, Clone)]
pub struct ModulePlan {
    pub module: ModuleId,
    pub version: String,
    pub backend: BackendKind,
    pub resolution: Resolution,
    /// Environment files written before the first step
    pub env_files: Vec<PathBuf>,
    pub steps: Vec<PlannedStep>,
}

/// Plan the build of `id` without running anything.
pub fn plan(prepared: &PreparedStack, settings: &StackSettings, id: ModuleId) -> Result<ModulePlan, InstallError> {
    let (module, resolution) = prepared.resolved(id)?;
    let backend = backend_for(module.backend, &settings.tools);

    let env_files = if module.descriptor.hosts_packages() {
        let ext = backend.env_file_extension();
        vec![
            ComposedEnvironment::global_path(&module.workdir, ext),
            ComposedEnvironment::workspace_path(&module.workdir, ext),
        ]
    } else {
        Vec::new()
    };

    let sequencer = BuildSequencer::new(
        module,
        &prepared.stack,
        resolution,
        backend,
        settings.tools.doxygen.clone(),
    );

    Ok(ModulePlan {
        module: id,
        version: module.version.clone(),
        backend: module.backend,
        resolution: resolution.clone(),
        env_files,
        steps: sequencer.plan(),
    })
}

/// Format a plan for the terminal.
pub fn format_plan(plan: &ModulePlan) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{} {} ({})", plan.module, plan.version, plan.backend);

    for id in &plan.resolution.included {
        let _ = writeln!(output, "  with     {}", id);
    }
    for (id, reason) in &plan.resolution.excluded {
        let _ = writeln!(output, "  without  {} ({})", id, reason);
    }

    if !plan.env_files.is_empty() {
        let _ = writeln!(output, "\nEnvironment:");
        for path in &plan.env_files {
            let _ = writeln!(output, "  {}", path.display());
        }
    }

    let _ = writeln!(output, "\nSteps:");
    for (i, planned) in plan.steps.iter().enumerate() {
        let _ = write!(output, "  {}. {}", i + 1, planned.step);
        match &planned.action {
            PlannedAction::Link(ids) => {
                let names: Vec<&str> = ids.iter().map(ModuleId::as_str).collect();
                if names.is_empty() {
                    let _ = writeln!(output, ": (none)");
                } else {
                    let _ = writeln!(output, ": {}", names.join(", "));
                }
            }
            PlannedAction::Remove(path) => {
                let _ = writeln!(output, ": remove {}", path.display());
            }
            PlannedAction::Run(inv) => {
                let _ = writeln!(output, "\n       $ {}", inv.display_command());
                let _ = writeln!(output, "       in {}", inv.cwd.display());
            }
            PlannedAction::RunIfAvailable { tool, invocation } => {
                let _ = writeln!(output, " (if {} is available)", tool);
                let _ = writeln!(output, "       $ {}", invocation.display_command());
                let _ = writeln!(output, "       in {}", invocation.cwd.display());
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::sequencer::Step;
    use crate::core::module::{Mode, Module};
    use crate::core::stack::Stack;
    use crate::ops::prepare::prepare;
    use crate::test_support::MockToolRunner;

    fn prepared(modules: Vec<Module>) -> PreparedStack {
        let stack = Stack::new(modules).unwrap();
        prepare(stack, &StackSettings::new("/tmp/log"), &MockToolRunner::new()).unwrap()
    }

    #[test]
    fn test_plan_without_gear() {
        let prepared = prepared(vec![
            Module::new(ModuleId::Lcio, "/opt/LCIO", "v01-12").with_mode(Mode::Use),
            Module::new(ModuleId::Gear, "/opt/GEAR", "v00-08").with_mode(Mode::Use),
            Module::new(ModuleId::Marlin, "/opt/Marlin", "v01-00").with_disabled(vec![ModuleId::Gear]),
        ]);

        let plan = plan(&prepared, &StackSettings::new("/tmp/log"), ModuleId::Marlin).unwrap();
        let steps: Vec<Step> = plan.steps.iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            vec![Step::LinkPackages, Step::Configure, Step::Compile, Step::Install]
        );
        assert_eq!(plan.env_files[0], PathBuf::from("/opt/Marlin/userlib.gmk"));

        let output = format_plan(&plan);
        assert!(output.contains("without  GEAR (disabled)"));
        assert!(output.contains("-DBUILD_WITH_GEAR=OFF"));
        assert!(output.contains("-DLCIO_HOME=/opt/LCIO"));
    }

    #[test]
    fn test_plan_unknown_module() {
        let prepared = prepared(vec![Module::new(ModuleId::Lcio, "/opt/LCIO", "v01-12")]);
        let err = plan(&prepared, &StackSettings::new("/tmp/log"), ModuleId::Marlin).unwrap_err();
        assert!(matches!(err, InstallError::UnknownModule { .. }));
    }
}
