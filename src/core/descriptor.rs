//! Static per-module metadata.
//!
//! A descriptor says which files prove a module is installed, which other
//! modules it needs, and which of its optional modules the CMake backend can
//! discover on its own ("build with" candidates).

use std::path::Path;

use crate::builder::backend::BackendKind;
use crate::core::module_id::ModuleId;

/// Role of a module inside the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRole {
    /// Hosts plugin packages through a link directory and generated env files.
    Framework,
    /// Plugin package compiled inside a framework's workspace.
    Package,
    /// Self-contained library other modules build against.
    Library,
}

/// A group of alternative files; any single one present satisfies the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup(pub Vec<String>);

impl FileGroup {
    /// Create a group from alternatives.
    pub fn new<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FileGroup(alternatives.into_iter().map(Into::into).collect())
    }

    /// Check whether any alternative exists below `root`.
    pub fn is_satisfied(&self, root: &Path) -> bool {
        self.0.iter().any(|f| root.join(f).exists())
    }

    /// The alternatives of this group.
    pub fn alternatives(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for FileGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" | "))
    }
}

/// Static metadata for one module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    pub role: ModuleRole,
    /// Files that must exist in the installation path
    pub required_files: Vec<FileGroup>,
    /// Modules that must be installed before this one is built
    pub required: Vec<ModuleId>,
    /// Modules wired in when present and compatible
    pub optional: Vec<ModuleId>,
    /// Optional modules the CMake backend discovers by itself
    pub build_with: Vec<ModuleId>,
    /// Library name used for the default `USERLIBS` contribution
    pub library: Option<&'static str>,
}

impl ModuleDescriptor {
    /// Look up the built-in descriptor for a module.
    pub fn for_id(id: ModuleId) -> Self {
        use ModuleId::*;

        match id {
            Marlin => ModuleDescriptor {
                id,
                role: ModuleRole::Framework,
                required_files: vec![lib_group("Marlin"), FileGroup::new(["bin/Marlin"])],
                required: vec![Lcio],
                optional: vec![
                    MarlinUtil,
                    CedViewer,
                    MarlinReco,
                    PandoraPfa,
                    SiliconDigi,
                    LcfiVertex,
                    Gear,
                    Clhep,
                    Lccd,
                    Raida,
                ],
                build_with: vec![Gear, Clhep, Lccd, Raida],
                library: Some("Marlin"),
            },
            MarlinUtil | CedViewer | MarlinReco | PandoraPfa | SiliconDigi | LcfiVertex => {
                ModuleDescriptor::package(id)
            }
            Lcio => ModuleDescriptor::library(id, "lcio", vec![]),
            Gear => ModuleDescriptor::library(id, "gear", vec![]),
            Clhep => ModuleDescriptor::library(id, "CLHEP", vec![]),
            Lccd => ModuleDescriptor::library(id, "lccd", vec![Lcio]),
            Raida => ModuleDescriptor::library(id, "RAIDA", vec![]),
            AidaJni => ModuleDescriptor::library(id, "AIDAJNI", vec![]),
            Qt => ModuleDescriptor {
                id,
                role: ModuleRole::Library,
                required_files: vec![FileGroup::new(["bin/qmake"])],
                required: vec![],
                optional: vec![],
                build_with: vec![],
                library: None,
            },
        }
    }

    fn package(id: ModuleId) -> Self {
        ModuleDescriptor {
            id,
            role: ModuleRole::Package,
            required_files: vec![lib_group(id.as_str())],
            required: vec![],
            optional: vec![],
            build_with: vec![],
            library: Some(id.as_str()),
        }
    }

    fn library(id: ModuleId, lib: &'static str, required: Vec<ModuleId>) -> Self {
        ModuleDescriptor {
            id,
            role: ModuleRole::Library,
            required_files: vec![lib_group(lib)],
            required,
            optional: vec![],
            build_with: vec![],
            library: Some(lib),
        }
    }

    /// Whether this module hosts a package link directory.
    pub fn hosts_packages(&self) -> bool {
        self.role == ModuleRole::Framework
    }

    /// Whether this module can be wired into a consumer built with `backend`.
    ///
    /// Plugin packages are compiled in-tree through the link directory, which
    /// only the make backend does; under CMake they are separate projects.
    pub fn wireable_into(&self, backend: BackendKind) -> bool {
        match self.role {
            ModuleRole::Package => backend == BackendKind::Make,
            ModuleRole::Framework | ModuleRole::Library => true,
        }
    }

    /// Whether `id` is a "build with" candidate of this module.
    pub fn is_build_with(&self, id: ModuleId) -> bool {
        self.build_with.contains(&id)
    }
}

/// Static or shared library alternatives for `name`.
fn lib_group(name: &str) -> FileGroup {
    FileGroup::new([
        format!("lib/lib{}.a", name),
        format!("lib/lib{}.so", name),
        format!("lib/lib{}.dylib", name),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_marlin_descriptor() {
        let desc = ModuleDescriptor::for_id(ModuleId::Marlin);
        assert!(desc.hosts_packages());
        assert_eq!(desc.required, vec![ModuleId::Lcio]);
        assert!(desc.is_build_with(ModuleId::Gear));
        assert!(!desc.is_build_with(ModuleId::MarlinUtil));
        // every build-with candidate is also optional
        for id in &desc.build_with {
            assert!(desc.optional.contains(id));
        }
    }

    #[test]
    fn test_file_group_any_alternative() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("lib")).unwrap();

        let group = lib_group("gear");
        assert!(!group.is_satisfied(tmp.path()));

        std::fs::write(tmp.path().join("lib/libgear.so"), "").unwrap();
        assert!(group.is_satisfied(tmp.path()));
    }

    #[test]
    fn test_packages_only_wire_into_make() {
        let desc = ModuleDescriptor::for_id(ModuleId::MarlinReco);
        assert!(desc.wireable_into(BackendKind::Make));
        assert!(!desc.wireable_into(BackendKind::CMake));

        let gear = ModuleDescriptor::for_id(ModuleId::Gear);
        assert!(gear.wireable_into(BackendKind::CMake));
    }
}
