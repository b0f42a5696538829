//! Package link directory.
//!
//! A framework compiles its plugin packages from `<workspace>/packages`, which
//! holds one symlink per package pointing at the package's installation path.
//! Refreshing the directory is idempotent: links that already point at the
//! right place are kept, stale links are replaced, and anything that is not a
//! symlink is left alone with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{InstallError, Warning};
use crate::core::module::Module;
use crate::util::fs::{ensure_dir, is_symlink, symlink};

/// Version-control metadata that may live in the link directory.
const VCS_ENTRIES: [&str; 3] = ["CVS", ".svn", ".git"];

/// What a refresh did.
#[derive(Debug, Clone, Default)]
pub struct LinkReport {
    /// Packages linked in this run
    pub created: Vec<String>,
    /// Packages whose link was already correct
    pub kept: Vec<String>,
    /// Stale links that were removed
    pub removed: Vec<PathBuf>,
    /// Version-control entries that were not touched
    pub preserved: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Maintains the link directory of one module.
pub struct PackageLinker {
    module: String,
    dir: PathBuf,
}

impl PackageLinker {
    pub fn new(module: &Module) -> Self {
        PackageLinker {
            module: module.name().to_string(),
            dir: module.links_dir(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bring the link directory in line with `packages`.
    pub fn refresh(&self, packages: &[&Module]) -> Result<LinkReport, InstallError> {
        let mut report = LinkReport::default();

        ensure_dir(&self.dir).map_err(|source| InstallError::LinkFailed {
            path: self.dir.clone(),
            source,
        })?;

        for (name, path) in self.entries()? {
            if VCS_ENTRIES.contains(&name.as_str()) {
                report.preserved.push(name);
                continue;
            }

            if !is_symlink(&path) {
                report.warnings.push(
                    Warning::LinkCollision {
                        module: self.module.clone(),
                        path,
                    }
                    .emit(),
                );
                continue;
            }

            let wanted = packages.iter().find(|p| p.name() == name);
            let current = fs::read_link(&path).ok();
            match wanted {
                Some(package) if current.as_deref() == Some(package.install_path.as_path()) => {
                    report.kept.push(name);
                }
                _ => {
                    fs::remove_file(&path).map_err(|source| InstallError::LinkFailed {
                        path: path.clone(),
                        source,
                    })?;
                    tracing::debug!("removed stale link {}", path.display());
                    report.removed.push(path);
                }
            }
        }

        for package in packages {
            let name = package.name();
            if report.kept.iter().any(|k| k == name) {
                continue;
            }

            let link = self.dir.join(name);
            if link.exists() || is_symlink(&link) {
                report.warnings.push(
                    Warning::LinkCollision {
                        module: name.to_string(),
                        path: link,
                    }
                    .emit(),
                );
                continue;
            }

            symlink(&package.install_path, &link).map_err(|source| InstallError::LinkFailed {
                path: link.clone(),
                source,
            })?;
            tracing::info!(
                "{}: linked {} -> {}",
                self.module,
                name,
                package.install_path.display()
            );
            report.created.push(name.to_string());
        }

        Ok(report)
    }

    /// Directory entries sorted by name.
    fn entries(&self) -> Result<Vec<(String, PathBuf)>, InstallError> {
        let read = fs::read_dir(&self.dir).map_err(|source| InstallError::LinkFailed {
            path: self.dir.clone(),
            source,
        })?;

        let mut entries = Vec::new();
        for entry in read {
            let entry = entry.map_err(|source| InstallError::LinkFailed {
                path: self.dir.clone(),
                source,
            })?;
            entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
        entries.sort();
        Ok(entries)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::builder::backend::BackendKind;
    use crate::core::module_id::ModuleId;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        marlin: Module,
        reco: Module,
        util: Module,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let module = |id: ModuleId| {
            let path = root.join(id.as_str());
            fs::create_dir_all(&path).unwrap();
            Module::new(id, path, "v01-00")
        };
        Fixture {
            marlin: module(ModuleId::Marlin).with_backend(BackendKind::Make),
            reco: module(ModuleId::MarlinReco),
            util: module(ModuleId::MarlinUtil),
            _tmp: tmp,
        }
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let fx = fixture();
        let linker = PackageLinker::new(&fx.marlin);

        let first = linker.refresh(&[&fx.reco, &fx.util]).unwrap();
        assert_eq!(first.created, vec!["MarlinReco", "MarlinUtil"]);
        assert!(first.warnings.is_empty());

        let second = linker.refresh(&[&fx.reco, &fx.util]).unwrap();
        assert!(second.created.is_empty());
        assert!(second.removed.is_empty());
        assert_eq!(second.kept, vec!["MarlinReco", "MarlinUtil"]);

        let target = fs::read_link(linker.dir().join("MarlinReco")).unwrap();
        assert_eq!(target, fx.reco.install_path);
    }

    #[test]
    fn test_stale_links_are_replaced() {
        let fx = fixture();
        let linker = PackageLinker::new(&fx.marlin);
        linker.refresh(&[&fx.reco, &fx.util]).unwrap();

        let report = linker.refresh(&[&fx.util]).unwrap();
        assert_eq!(report.removed, vec![linker.dir().join("MarlinReco")]);
        assert!(!is_symlink(&linker.dir().join("MarlinReco")));
        assert_eq!(report.kept, vec!["MarlinUtil"]);
    }

    #[test]
    fn test_non_symlink_collision_warns() {
        let fx = fixture();
        let linker = PackageLinker::new(&fx.marlin);
        fs::create_dir_all(linker.dir().join("MarlinReco")).unwrap();

        let report = linker.refresh(&[&fx.reco]).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(report
            .warnings
            .iter()
            .all(|w| matches!(w, Warning::LinkCollision { .. })));
        assert!(linker.dir().join("MarlinReco").is_dir());
    }

    #[test]
    fn test_vcs_metadata_is_preserved() {
        let fx = fixture();
        let linker = PackageLinker::new(&fx.marlin);
        fs::create_dir_all(linker.dir().join("CVS")).unwrap();

        let report = linker.refresh(&[&fx.reco]).unwrap();
        assert_eq!(report.preserved, vec!["CVS"]);
        assert!(report.warnings.is_empty());
        assert!(linker.dir().join("CVS").is_dir());
    }
}
