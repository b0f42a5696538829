//! Environment file composition.
//!
//! Each module that builds through generated environment files gets two of
//! them in its workspace:
//!
//! - `userlib.<ext>` holds only the module's own build flags.
//! - `userlib_workdir.<ext>` is what the workspace build includes. It carries
//!   the flags of every linked package, then those of the remaining active
//!   dependencies, and finally the module's own flags. Later writers win, so
//!   the module always has the last word.
//!
//! A module's section is written at most once per file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::core::dependency::DependencyGraph;
use crate::core::env_store::{EnvOp, EnvVar};
use crate::core::error::InstallError;
use crate::core::module::Module;
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;
use crate::resolver::optional::Resolution;
use crate::util::fs::write_atomic;
use crate::util::hash::Fingerprint;

/// Name and version written into generated file headers.
pub const GENERATOR: &str = concat!("ilcstack ", env!("CARGO_PKG_VERSION"));

const RULE: &str = "################################################################################";

/// Identity of one installation run.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub id: String,
    pub started: DateTime<Local>,
    pub generator: &'static str,
}

impl RunInfo {
    /// Start a run over `stack`.
    pub fn new(stack: &Stack) -> Self {
        let started = Local::now();
        let mut fp = Fingerprint::new();
        fp.update_str(&started.to_rfc3339());
        for module in stack.iter() {
            fp.update_strs([module.name(), module.version.as_str()]);
        }
        RunInfo {
            id: fp.finish_short(),
            started,
            generator: GENERATOR,
        }
    }
}

/// One module's contributions inside an environment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSection {
    pub module: ModuleId,
    pub vars: Vec<EnvVar>,
}

impl EnvSection {
    fn of(module: &Module) -> Self {
        EnvSection {
            module: module.id(),
            vars: module.build_env.iter().cloned().collect(),
        }
    }
}

/// A rendered environment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDocument {
    pub header: Vec<String>,
    pub sections: Vec<EnvSection>,
}

impl EnvDocument {
    fn push(&mut self, module: &Module) {
        self.sections.push(EnvSection::of(module));
    }

    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.sections.iter().any(|s| s.module == id)
    }

    /// Modules in write order.
    pub fn modules(&self) -> Vec<ModuleId> {
        self.sections.iter().map(|s| s.module).collect()
    }

    /// Effective tokens of `name` after replaying every section in order.
    pub fn value_of(&self, name: &str) -> Vec<String> {
        let mut value = Vec::new();
        for var in self.sections.iter().flat_map(|s| &s.vars).filter(|v| v.name == name) {
            if var.op == EnvOp::Override {
                value.clear();
            }
            value.extend(var.tokens.iter().cloned());
        }
        value
    }

    /// Render in makefile syntax.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            let _ = writeln!(out, "{}", line);
        }
        for section in &self.sections {
            let _ = writeln!(out, "\n# {}", section.module);
            for var in &section.vars {
                let _ = writeln!(out, "{} {} {}", var.name, var.op, var.tokens.join(" "));
            }
        }
        out
    }
}

/// The pair of files generated for a module.
#[derive(Debug, Clone)]
pub struct ComposedEnvironment {
    pub global: EnvDocument,
    pub workspace: EnvDocument,
}

impl ComposedEnvironment {
    pub fn global_path(dir: &Path, ext: &str) -> PathBuf {
        dir.join(format!("userlib.{}", ext))
    }

    pub fn workspace_path(dir: &Path, ext: &str) -> PathBuf {
        dir.join(format!("userlib_workdir.{}", ext))
    }

    /// Write both files into `dir`. A failure leaves any previous file intact.
    pub fn write(&self, dir: &Path, ext: &str) -> Result<Vec<PathBuf>, InstallError> {
        let files = [
            (Self::global_path(dir, ext), &self.global),
            (Self::workspace_path(dir, ext), &self.workspace),
        ];

        let mut written = Vec::new();
        for (path, doc) in files {
            write_atomic(&path, &doc.render()).map_err(|source| {
                InstallError::EnvironmentWriteFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            tracing::debug!("wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Compose the environment files of `module`.
pub fn compose(module: &Module, stack: &Stack, resolution: &Resolution, run: &RunInfo) -> ComposedEnvironment {
    let header = |scope: &str| {
        vec![
            RULE.to_string(),
            format!(
                "# Environment generated by {} on {} (run {})",
                run.generator,
                run.started.format("%a %b %e %H:%M:%S %Y"),
                run.id
            ),
            format!(
                "# {} for {} located at [ {} ]",
                scope,
                module.name(),
                module.install_path.display()
            ),
            RULE.to_string(),
        ]
    };

    let mut global = EnvDocument {
        header: header("global settings"),
        sections: Vec::new(),
    };
    global.push(module);

    let mut workspace = EnvDocument {
        header: header("workspace settings"),
        sections: Vec::new(),
    };
    let mut seen: Vec<ModuleId> = vec![module.id()];

    if module.descriptor.hosts_packages() {
        for id in resolution.packages(stack) {
            if let Some(package) = stack.get(id) {
                workspace.push(package);
                seen.push(id);
            }
        }
    }

    let closure = DependencyGraph::from_stack(stack).closure(stack, module.id(), &resolution.included);
    for id in closure {
        if seen.contains(&id) {
            continue;
        }
        if let Some(dep) = stack.get(id) {
            workspace.push(dep);
            seen.push(id);
        }
    }

    workspace.push(module);

    ComposedEnvironment { global, workspace }
}
