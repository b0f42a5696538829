//! Implementation of `ilcstack install`.
//!
//! Modules are processed in stack order. `use` modules are only validated.
//! `install` modules get their environment files written, then run their
//! build sequence. A fatal error stops the run at the failing module; modules
//! after it are left untouched.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::builder::backend::backend_for;
use crate::builder::compose::{compose, RunInfo};
use crate::builder::events::BuildEvent;
use crate::builder::sequencer::{BuildSequencer, Step};
use crate::builder::tool::ToolRunner;
use crate::core::error::{InstallError, Warning};
use crate::core::module::{Module, ModuleStatus};
use crate::core::module_id::ModuleId;
use crate::ops::load::StackSettings;
use crate::ops::prepare::PreparedStack;

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Modules to build (empty = every `install` module)
    pub modules: Vec<ModuleId>,
}

impl InstallOptions {
    fn selects(&self, id: ModuleId) -> bool {
        self.modules.is_empty() || self.modules.contains(&id)
    }
}

/// What happened to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// Built from sources in this run
    Built {
        steps: Vec<Step>,
        skipped: Vec<Step>,
        env_files: Vec<PathBuf>,
    },
    /// Existing installation in `use` mode
    Used,
    /// Not selected, but a complete installation is present
    AlreadyInstalled,
    /// Required files are missing and nothing was built
    Unavailable { missing: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ModuleReport {
    pub module: ModuleId,
    pub outcome: ModuleOutcome,
}

/// Summary of an installation run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub modules: Vec<ModuleReport>,
    pub warnings: Vec<Warning>,
    pub duration: Duration,
}

impl InstallReport {
    /// Number of modules built in this run.
    pub fn built(&self) -> usize {
        self.modules
            .iter()
            .filter(|r| matches!(r.outcome, ModuleOutcome::Built { .. }))
            .count()
    }
}

/// Run the installation over a prepared stack.
///
/// `on_event` sees every event as it happens, including the final
/// `build-finished` on failure.
pub fn install(
    prepared: &mut PreparedStack,
    settings: &StackSettings,
    opts: &InstallOptions,
    runner: &mut dyn ToolRunner,
    on_event: &mut dyn FnMut(&BuildEvent),
) -> Result<InstallReport, InstallError> {
    let start = Instant::now();
    let mut report = InstallReport::default();

    let result = install_modules(prepared, settings, opts, runner, on_event, &mut report);

    report.duration = start.elapsed();
    on_event(&BuildEvent::finished(
        result.is_ok(),
        report.duration.as_millis() as u64,
        report.built() as u64,
    ));

    result.map(|()| report)
}

fn install_modules(
    prepared: &mut PreparedStack,
    settings: &StackSettings,
    opts: &InstallOptions,
    runner: &mut dyn ToolRunner,
    on_event: &mut dyn FnMut(&BuildEvent),
    report: &mut InstallReport,
) -> Result<(), InstallError> {
    for &id in &opts.modules {
        prepared.module(id)?;
    }

    for warning in &prepared.warnings {
        on_event(&BuildEvent::warning(warning.clone()));
        report.warnings.push(warning.clone());
    }

    let run = RunInfo::new(&prepared.stack);

    for id in prepared.stack.ids() {
        let module = prepared.module(id)?;
        let missing = missing_names(module);

        let (status, outcome) = if !module.is_install() {
            if missing.is_empty() {
                (ModuleStatus::Installed, ModuleOutcome::Used)
            } else {
                let warning = Warning::MissingFiles {
                    module: module.name().to_string(),
                    files: missing.clone(),
                }
                .emit();
                on_event(&BuildEvent::warning(warning.clone()));
                report.warnings.push(warning);
                (ModuleStatus::Failed, ModuleOutcome::Unavailable { missing })
            }
        } else if !opts.selects(id) {
            if missing.is_empty() {
                (ModuleStatus::Installed, ModuleOutcome::AlreadyInstalled)
            } else {
                (module.status, ModuleOutcome::Unavailable { missing })
            }
        } else {
            match build_module(prepared, id, settings, &run, runner, on_event, report) {
                Ok(outcome) => {
                    on_event(&BuildEvent::ModuleFinished {
                        module: id.to_string(),
                        success: true,
                        failed_step: None,
                    });
                    (ModuleStatus::Installed, outcome)
                }
                Err(e) => {
                    on_event(&BuildEvent::ModuleFinished {
                        module: id.to_string(),
                        success: false,
                        failed_step: e.failed_step(),
                    });
                    if let Some(module) = prepared.stack.get_mut(id) {
                        module.status = ModuleStatus::Failed;
                    }
                    return Err(e);
                }
            }
        };

        if let Some(module) = prepared.stack.get_mut(id) {
            module.status = status;
        }
        report.modules.push(ModuleReport { module: id, outcome });
    }

    Ok(())
}

fn build_module(
    prepared: &PreparedStack,
    id: ModuleId,
    settings: &StackSettings,
    run: &RunInfo,
    runner: &mut dyn ToolRunner,
    on_event: &mut dyn FnMut(&BuildEvent),
    report: &mut InstallReport,
) -> Result<ModuleOutcome, InstallError> {
    let (module, resolution) = prepared.resolved(id)?;

    for &dep in &module.required {
        let installed = prepared.stack.get(dep).map(Module::is_installed).unwrap_or(false);
        if !installed {
            return Err(InstallError::DependencyMissing {
                module: module.name().to_string(),
                dependency: dep.to_string(),
            });
        }
    }

    on_event(&BuildEvent::ModuleStarted {
        module: module.name().to_string(),
        version: module.version.clone(),
        backend: module.backend.to_string(),
    });

    let backend = backend_for(module.backend, &settings.tools);

    let mut env_files = Vec::new();
    if module.descriptor.hosts_packages() {
        let env = compose(module, &prepared.stack, resolution, run);
        env_files = env.write(&module.workdir, backend.env_file_extension())?;
    }

    let mut sequencer = BuildSequencer::new(
        module,
        &prepared.stack,
        resolution,
        backend,
        settings.tools.doxygen.clone(),
    );
    let sequence = sequencer.run(runner)?;

    for &step in &sequence.completed {
        on_event(&BuildEvent::StepFinished {
            module: module.name().to_string(),
            step,
            skipped: false,
        });
    }
    for &step in &sequence.skipped {
        on_event(&BuildEvent::StepFinished {
            module: module.name().to_string(),
            step,
            skipped: true,
        });
    }
    for warning in sequence.warnings {
        on_event(&BuildEvent::warning(warning.clone()));
        report.warnings.push(warning);
    }

    let missing = missing_names(module);
    if !missing.is_empty() {
        let step = if sequence.completed.contains(&Step::Install) {
            Step::Install
        } else {
            Step::Compile
        };
        return Err(InstallError::BuildStepFailed {
            module: module.name().to_string(),
            step,
            reason: format!("required files missing after build: {}", missing.join(", ")),
            log: runner.log_file().to_path_buf(),
        });
    }

    Ok(ModuleOutcome::Built {
        steps: sequence.completed,
        skipped: sequence.skipped,
        env_files,
    })
}

fn missing_names(module: &Module) -> Vec<String> {
    module
        .missing_files()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}
