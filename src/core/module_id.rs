//! Closed set of module identifiers known to the installer.
//!
//! Every module that can appear in a stack file has a variant here. Names are
//! parsed once when the stack is constructed; after that all lookups are typed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a buildable module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModuleId {
    /// The Marlin framework (hosts plugin packages)
    Marlin,
    MarlinUtil,
    CedViewer,
    MarlinReco,
    PandoraPfa,
    SiliconDigi,
    LcfiVertex,
    Lcio,
    Gear,
    Clhep,
    Lccd,
    Raida,
    AidaJni,
    Qt,
}

impl ModuleId {
    /// All identifiers in declaration order.
    pub const ALL: [ModuleId; 14] = [
        ModuleId::Marlin,
        ModuleId::MarlinUtil,
        ModuleId::CedViewer,
        ModuleId::MarlinReco,
        ModuleId::PandoraPfa,
        ModuleId::SiliconDigi,
        ModuleId::LcfiVertex,
        ModuleId::Lcio,
        ModuleId::Gear,
        ModuleId::Clhep,
        ModuleId::Lccd,
        ModuleId::Raida,
        ModuleId::AidaJni,
        ModuleId::Qt,
    ];

    /// Canonical module name, as written in stack files and link directories.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleId::Marlin => "Marlin",
            ModuleId::MarlinUtil => "MarlinUtil",
            ModuleId::CedViewer => "CEDViewer",
            ModuleId::MarlinReco => "MarlinReco",
            ModuleId::PandoraPfa => "PandoraPFA",
            ModuleId::SiliconDigi => "SiliconDigi",
            ModuleId::LcfiVertex => "LCFIVertex",
            ModuleId::Lcio => "LCIO",
            ModuleId::Gear => "GEAR",
            ModuleId::Clhep => "CLHEP",
            ModuleId::Lccd => "LCCD",
            ModuleId::Raida => "RAIDA",
            ModuleId::AidaJni => "AIDAJNI",
            ModuleId::Qt => "QT",
        }
    }

    /// Upper-case form used for environment variables and CMake switches.
    pub fn env_name(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleId::ALL
            .iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown module `{}`", s))
    }
}

impl TryFrom<String> for ModuleId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("marlinutil".parse::<ModuleId>(), Ok(ModuleId::MarlinUtil));
        assert_eq!("LCIO".parse::<ModuleId>(), Ok(ModuleId::Lcio));
        assert_eq!("cedviewer".parse::<ModuleId>(), Ok(ModuleId::CedViewer));
    }

    #[test]
    fn test_unknown_module() {
        let err = "ROOT".parse::<ModuleId>().unwrap_err();
        assert!(err.contains("ROOT"));
    }

    #[test]
    fn test_names_round_trip_through_display() {
        for id in ModuleId::ALL {
            assert_eq!(id.to_string().parse::<ModuleId>(), Ok(id));
        }
    }
}
