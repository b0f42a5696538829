//! Implementation of `ilcstack env`.

use std::path::PathBuf;

use crate::builder::backend::backend_for;
use crate::builder::compose::{compose, ComposedEnvironment, RunInfo};
use crate::core::error::InstallError;
use crate::core::module_id::ModuleId;
use crate::ops::load::StackSettings;
use crate::ops::prepare::PreparedStack;

/// Composed environment of one module and where it belongs.
#[derive(Debug, Clone)]
pub struct ModuleEnvironment {
    pub env: ComposedEnvironment,
    /// Module workspace
    pub dir: PathBuf,
    pub ext: &'static str,
}

impl ModuleEnvironment {
    pub fn global_path(&self) -> PathBuf {
        ComposedEnvironment::global_path(&self.dir, self.ext)
    }

    pub fn workspace_path(&self) -> PathBuf {
        ComposedEnvironment::workspace_path(&self.dir, self.ext)
    }

    /// Write both files, replacing earlier ones.
    pub fn write(&self) -> Result<Vec<PathBuf>, InstallError> {
        self.env.write(&self.dir, self.ext)
    }
}

/// Compose the environment files of `id`.
pub fn environment(
    prepared: &PreparedStack,
    settings: &StackSettings,
    id: ModuleId,
) -> Result<ModuleEnvironment, InstallError> {
    let (module, resolution) = prepared.resolved(id)?;
    let run = RunInfo::new(&prepared.stack);

    Ok(ModuleEnvironment {
        env: compose(module, &prepared.stack, resolution, &run),
        dir: module.workdir.clone(),
        ext: backend_for(module.backend, &settings.tools).env_file_extension(),
    })
}
