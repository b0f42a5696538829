//! Build step sequencing.
//!
//! A module is built in a fixed order of steps:
//!
//! ```text
//! LinkPackages -> Clean -> Configure -> Compile -> Install -> Document
//! ```
//!
//! Steps that do not apply are skipped: linking only for modules that host
//! packages, cleaning only on rebuild, configure and install only for the CMake
//! backend, documentation only on request. The first failing step aborts the
//! sequence; nothing after it runs and nothing before it is rolled back.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::builder::backend::{BuildBackend, CleanAction};
use crate::builder::linker::{LinkReport, PackageLinker};
use crate::builder::tool::{Invocation, ToolRunner};
use crate::core::dependency::DependencyGraph;
use crate::core::descriptor::ModuleRole;
use crate::core::error::{InstallError, Warning};
use crate::core::module::Module;
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;
use crate::resolver::optional::Resolution;
use crate::util::fs::{ensure_dir, remove_file_if_exists};

/// A build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    LinkPackages,
    Clean,
    Configure,
    Compile,
    Install,
    Document,
}

impl Step {
    /// Reason recorded when the step fails.
    pub fn failure_reason(&self) -> String {
        format!("failed to {}", self)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::LinkPackages => write!(f, "link packages"),
            Step::Clean => write!(f, "clean"),
            Step::Configure => write!(f, "configure"),
            Step::Compile => write!(f, "compile"),
            Step::Install => write!(f, "install"),
            Step::Document => write!(f, "build documentation"),
        }
    }
}

/// Where a sequence stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerState {
    Ready,
    Running(Step),
    Finished,
    Aborted { step: Step, reason: String },
}

/// What a step will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Refresh the link directory with these packages
    Link(Vec<ModuleId>),
    /// Delete a file
    Remove(PathBuf),
    /// Run an external tool
    Run(Invocation),
    /// Skipped at run time when the tool is missing
    RunIfAvailable { tool: String, invocation: Invocation },
}

/// A step together with its action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub action: PlannedAction,
}

/// Outcome of a finished sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceReport {
    pub completed: Vec<Step>,
    pub skipped: Vec<Step>,
    pub links: Option<LinkReport>,
    pub warnings: Vec<Warning>,
}

/// Runs the build steps of one module.
pub struct BuildSequencer<'a> {
    module: &'a Module,
    stack: &'a Stack,
    resolution: &'a Resolution,
    backend: Box<dyn BuildBackend>,
    doc_tool: String,
    deps: Vec<&'a Module>,
    state: SequencerState,
}

impl<'a> BuildSequencer<'a> {
    pub fn new(
        module: &'a Module,
        stack: &'a Stack,
        resolution: &'a Resolution,
        backend: Box<dyn BuildBackend>,
        doc_tool: impl Into<String>,
    ) -> Self {
        let deps = DependencyGraph::from_stack(stack)
            .closure(stack, module.id(), &resolution.included)
            .into_iter()
            .filter_map(|id| stack.get(id))
            .collect();

        BuildSequencer {
            module,
            stack,
            resolution,
            backend,
            doc_tool: doc_tool.into(),
            deps,
            state: SequencerState::Ready,
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Settings exported to every tool: dependencies first, the module last.
    fn tool_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        for dep in &self.deps {
            env.extend(dep.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        env.extend(self.module.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    fn with_env(&self, mut invocation: Invocation) -> Invocation {
        invocation.env = self.tool_env();
        invocation
    }

    fn linked_packages(&self) -> Vec<ModuleId> {
        self.resolution.packages(self.stack)
    }

    /// Every package-capable module of the stack.
    fn all_packages(&self) -> Vec<ModuleId> {
        self.stack
            .iter()
            .filter(|m| m.descriptor.role == ModuleRole::Package)
            .map(|m| m.id())
            .collect()
    }

    /// The steps this sequence would run, without running them.
    pub fn plan(&self) -> Vec<PlannedStep> {
        let module = self.module;
        let mut plan = Vec::new();

        if module.descriptor.hosts_packages() {
            plan.push(PlannedStep {
                step: Step::LinkPackages,
                action: PlannedAction::Link(self.linked_packages()),
            });
        }

        if module.rebuild {
            let action = match self.backend.clean(module) {
                CleanAction::RemoveCache(path) => PlannedAction::Remove(path),
                CleanAction::Run(inv) => PlannedAction::Run(self.with_env(inv)),
            };
            plan.push(PlannedStep {
                step: Step::Clean,
                action,
            });
        }

        if let Some(inv) = self.backend.configure(module, &self.deps, self.resolution) {
            plan.push(PlannedStep {
                step: Step::Configure,
                action: PlannedAction::Run(self.with_env(inv)),
            });
        }

        plan.push(PlannedStep {
            step: Step::Compile,
            action: PlannedAction::Run(self.with_env(self.backend.compile(module))),
        });

        if let Some(inv) = self.backend.install(module) {
            plan.push(PlannedStep {
                step: Step::Install,
                action: PlannedAction::Run(self.with_env(inv)),
            });
        }

        if module.build_doc {
            plan.push(PlannedStep {
                step: Step::Document,
                action: PlannedAction::RunIfAvailable {
                    tool: self.doc_tool.clone(),
                    invocation: self.with_env(self.backend.document(module)),
                },
            });
        }

        plan
    }

    /// Run every planned step, stopping at the first failure.
    pub fn run(&mut self, runner: &mut dyn ToolRunner) -> Result<SequenceReport, InstallError> {
        let mut report = SequenceReport::default();

        for planned in self.plan() {
            self.state = SequencerState::Running(planned.step);
            tracing::info!("{}: {}", self.module.name(), planned.step);

            match planned.action {
                PlannedAction::Link(ids) => {
                    let links = self.link(&ids)?;
                    report.warnings.extend(links.warnings.iter().cloned());
                    report.links = Some(links);
                }
                PlannedAction::Remove(path) => {
                    if let Err(e) = remove_file_if_exists(&path) {
                        tracing::error!("cannot remove {}: {}", path.display(), e);
                        return Err(self.abort(planned.step, runner));
                    }
                }
                PlannedAction::Run(inv) => self.execute(&inv, runner)?,
                PlannedAction::RunIfAvailable { tool, invocation } => {
                    if self.backend.links_all_packages_for_doc() {
                        let links = self.link(&self.all_packages())?;
                        report.warnings.extend(links.warnings);
                    }
                    if !runner.on_path(&tool) {
                        report.warnings.push(
                            Warning::ToolUnavailable {
                                module: self.module.name().to_string(),
                                tool,
                            }
                            .emit(),
                        );
                        report.skipped.push(planned.step);
                        continue;
                    }
                    self.execute(&invocation, runner)?;
                }
            }

            report.completed.push(planned.step);
        }

        self.state = SequencerState::Finished;
        Ok(report)
    }

    fn link(&self, ids: &[ModuleId]) -> Result<LinkReport, InstallError> {
        let packages: Vec<&Module> = ids.iter().filter_map(|id| self.stack.get(*id)).collect();
        PackageLinker::new(self.module).refresh(&packages)
    }

    fn execute(&mut self, inv: &Invocation, runner: &mut dyn ToolRunner) -> Result<(), InstallError> {
        if !runner.on_path(&inv.program) {
            self.state = SequencerState::Aborted {
                step: inv.step,
                reason: format!("{} not found", inv.program),
            };
            return Err(InstallError::ToolUnavailable {
                module: self.module.name().to_string(),
                tool: inv.program.clone(),
                step: inv.step,
            });
        }

        if inv.step == Step::Configure {
            if let Err(e) = ensure_dir(&inv.cwd) {
                tracing::error!("cannot create {}: {}", inv.cwd.display(), e);
                return Err(self.abort(inv.step, runner));
            }
        }

        tracing::debug!("{}: running `{}`", self.module.name(), inv.display_command());
        match runner.run(inv) {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                tracing::error!(
                    "{}: `{}` exited with {:?}",
                    self.module.name(),
                    inv.display_command(),
                    status.code
                );
                Err(self.abort(inv.step, runner))
            }
            Err(e) => {
                tracing::error!("{}: {:#}", self.module.name(), e);
                Err(self.abort(inv.step, runner))
            }
        }
    }

    fn abort(&mut self, step: Step, runner: &dyn ToolRunner) -> InstallError {
        let reason = step.failure_reason();
        self.state = SequencerState::Aborted {
            step,
            reason: reason.clone(),
        };
        InstallError::BuildStepFailed {
            module: self.module.name().to_string(),
            step,
            reason,
            log: runner.log_file().to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::backend::{backend_for, BackendKind, CMakeBackend, ToolSettings};
    use crate::core::module::ModuleStatus;
    use crate::resolver::optional::resolve;
    use crate::test_support::MockToolRunner;
    use tempfile::TempDir;

    fn initialized(id: ModuleId, root: &std::path::Path) -> Module {
        let mut module = Module::new(id, root.join(id.as_str()), "v01-00");
        module.status = ModuleStatus::Initialized;
        module
    }

    fn sequencer<'a>(module: &'a Module, stack: &'a Stack, resolution: &'a Resolution) -> BuildSequencer<'a> {
        let backend = backend_for(module.backend, &ToolSettings::default());
        BuildSequencer::new(module, stack, resolution, backend, "doxygen")
    }

    #[test]
    fn test_cmake_runs_all_steps() {
        let tmp = TempDir::new().unwrap();
        let lcio = initialized(ModuleId::Lcio, tmp.path()).with_env("LCIO", "/opt/LCIO");
        let marlin = initialized(ModuleId::Marlin, tmp.path()).with_env("MARLIN", "/opt/Marlin");
        let stack = Stack::new(vec![lcio, marlin.clone()]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new();

        let mut seq = sequencer(&marlin, &stack, &resolution);
        let report = seq.run(&mut runner).unwrap();

        assert_eq!(
            report.completed,
            vec![Step::LinkPackages, Step::Configure, Step::Compile, Step::Install]
        );
        assert_eq!(runner.steps(), vec![Step::Configure, Step::Compile, Step::Install]);
        assert_eq!(seq.state(), &SequencerState::Finished);

        let configure = &runner.invocations[0];
        assert_eq!(configure.env.get("LCIO").map(String::as_str), Some("/opt/LCIO"));
        assert_eq!(configure.env.get("MARLIN").map(String::as_str), Some("/opt/Marlin"));
        assert!(CMakeBackend::build_dir(&marlin).is_dir());
    }

    #[test]
    fn test_compile_failure_aborts() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path()).with_build_doc(true);
        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone()]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new().fail_at(Step::Compile, 2);

        let mut seq = sequencer(&marlin, &stack, &resolution);
        let err = seq.run(&mut runner).unwrap_err();

        match err {
            InstallError::BuildStepFailed { step, reason, .. } => {
                assert_eq!(step, Step::Compile);
                assert_eq!(reason, "failed to compile");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.steps(), vec![Step::Configure, Step::Compile]);
        assert!(matches!(
            seq.state(),
            SequencerState::Aborted { step: Step::Compile, .. }
        ));
    }

    #[test]
    fn test_make_backend_skips_configure_and_install() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path())
            .with_backend(BackendKind::Make)
            .with_rebuild(true);
        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone()]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new();

        sequencer(&marlin, &stack, &resolution).run(&mut runner).unwrap();

        assert_eq!(runner.steps(), vec![Step::Clean, Step::Compile]);
        assert_eq!(runner.invocations[0].display_command(), "make clean");
    }

    #[test]
    fn test_rebuild_removes_cmake_cache_before_configure() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path()).with_rebuild(true);
        let cache = CMakeBackend::build_dir(&marlin).join("CMakeCache.txt");
        std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
        std::fs::write(&cache, "").unwrap();

        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone()]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new();

        let report = sequencer(&marlin, &stack, &resolution).run(&mut runner).unwrap();
        assert!(!cache.exists());
        assert_eq!(report.completed[1], Step::Clean);
        assert_eq!(runner.steps()[0], Step::Configure);
    }

    #[test]
    fn test_missing_doxygen_skips_documentation() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path()).with_build_doc(true);
        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone()]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new().without_tool("doxygen");

        let report = sequencer(&marlin, &stack, &resolution).run(&mut runner).unwrap();
        assert_eq!(report.skipped, vec![Step::Document]);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::ToolUnavailable { tool, .. } if tool == "doxygen")));
        assert!(!runner.steps().contains(&Step::Document));
    }

    #[test]
    fn test_cmake_documentation_links_every_package() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path()).with_build_doc(true);
        let reco = initialized(ModuleId::MarlinReco, tmp.path());
        std::fs::create_dir_all(&reco.install_path).unwrap();
        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone(), reco]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new();

        let report = sequencer(&marlin, &stack, &resolution).run(&mut runner).unwrap();

        assert_eq!(report.links.unwrap().created, Vec::<String>::new());
        assert!(crate::util::fs::is_symlink(&marlin.links_dir().join("MarlinReco")));
        let doc = runner.invocations.last().unwrap();
        assert_eq!(doc.step, Step::Document);
        assert_eq!(doc.display_command(), "make doc");
        assert_eq!(doc.cwd, marlin.workdir);
    }

    #[test]
    fn test_cmake_documentation_links_without_doxygen() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path()).with_build_doc(true);
        let reco = initialized(ModuleId::MarlinReco, tmp.path());
        std::fs::create_dir_all(&reco.install_path).unwrap();
        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone(), reco]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new().without_tool("doxygen");

        let report = sequencer(&marlin, &stack, &resolution).run(&mut runner).unwrap();

        assert_eq!(report.skipped, vec![Step::Document]);
        assert!(crate::util::fs::is_symlink(&marlin.links_dir().join("MarlinReco")));
    }

    #[test]
    fn test_missing_build_tool_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let marlin = initialized(ModuleId::Marlin, tmp.path());
        let stack = Stack::new(vec![initialized(ModuleId::Lcio, tmp.path()), marlin.clone()]).unwrap();
        let resolution = resolve(&marlin, &stack);
        let mut runner = MockToolRunner::new().without_tool("cmake");

        let err = sequencer(&marlin, &stack, &resolution).run(&mut runner).unwrap_err();
        assert!(matches!(
            err,
            InstallError::ToolUnavailable { step: Step::Configure, .. }
        ));
        assert!(runner.invocations.is_empty());
    }
}
