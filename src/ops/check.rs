//! Implementation of `ilcstack check`.
//!
//! Validates a prepared stack without building anything: which modules are
//! complete on disk, which optional modules each one builds with, and whether
//! the build tools are available.

use std::fmt::Write;

use crate::builder::backend::backend_for;
use crate::builder::tool::ToolRunner;
use crate::core::error::Warning;
use crate::core::module::{Mode, Module};
use crate::core::module_id::ModuleId;
use crate::ops::load::StackSettings;
use crate::ops::prepare::PreparedStack;

/// State of one module on disk.
#[derive(Debug, Clone)]
pub struct ModuleCheck {
    pub module: ModuleId,
    pub version: String,
    pub mode: Mode,
    pub install_path: std::path::PathBuf,
    /// Required file groups not present
    pub missing: Vec<String>,
    pub required: Vec<ModuleId>,
    pub with: Vec<ModuleId>,
    pub without: Vec<ModuleId>,
}

impl ModuleCheck {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Availability of one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub name: String,
    pub found: bool,
    /// Missing optional tools only skip a step
    pub required: bool,
}

/// Result of checking a stack.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub modules: Vec<ModuleCheck>,
    pub tools: Vec<ToolCheck>,
    pub warnings: Vec<Warning>,
}

impl CheckReport {
    /// Every `use` module is complete and every required tool is present.
    pub fn is_ok(&self) -> bool {
        self.modules
            .iter()
            .filter(|m| m.mode == Mode::Use)
            .all(ModuleCheck::is_complete)
            && self.tools.iter().filter(|t| t.required).all(|t| t.found)
    }
}

/// Check a prepared stack.
pub fn check(prepared: &PreparedStack, settings: &StackSettings, tools: &dyn ToolRunner) -> CheckReport {
    let mut report = CheckReport {
        warnings: prepared.warnings.clone(),
        ..CheckReport::default()
    };

    for module in prepared.stack.iter() {
        let resolution = prepared.resolution(module.id());
        let missing = missing_names(module);

        if module.mode == Mode::Use && !missing.is_empty() {
            report.warnings.push(
                Warning::MissingFiles {
                    module: module.name().to_string(),
                    files: missing.clone(),
                }
                .emit(),
            );
        }

        report.modules.push(ModuleCheck {
            module: module.id(),
            version: module.version.clone(),
            mode: module.mode,
            install_path: module.install_path.clone(),
            missing,
            required: module.required.clone(),
            with: resolution.map(|r| r.included.clone()).unwrap_or_default(),
            without: resolution.map(|r| r.excluded_ids()).unwrap_or_default(),
        });
    }

    let building: Vec<&Module> = prepared.stack.iter().filter(|m| m.is_install()).collect();
    for module in &building {
        let backend = backend_for(module.backend, &settings.tools);
        for tool in backend.required_tools() {
            push_tool(&mut report.tools, tool, true, tools);
        }
    }
    if building.iter().any(|m| m.build_doc) {
        push_tool(&mut report.tools, &settings.tools.doxygen, false, tools);
    }

    report
}

fn push_tool(checks: &mut Vec<ToolCheck>, name: &str, required: bool, tools: &dyn ToolRunner) {
    if checks.iter().any(|t| t.name == name) {
        return;
    }
    checks.push(ToolCheck {
        name: name.to_string(),
        found: tools.on_path(name),
        required,
    });
}

fn missing_names(module: &Module) -> Vec<String> {
    module
        .missing_files()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn join(ids: &[ModuleId]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.iter().map(ModuleId::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Format a check report for the terminal.
pub fn format_report(report: &CheckReport, verbose: bool) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Modules:");
    for check in &report.modules {
        let status = match (check.mode, check.is_complete()) {
            (_, true) => "[OK]",
            (Mode::Use, false) => "[!!]",
            (Mode::Install, false) => "[--]",
        };
        let _ = writeln!(
            output,
            "  {} {} {} ({})",
            status, check.module, check.version, check.mode
        );

        if verbose {
            let _ = writeln!(output, "      Path: {}", check.install_path.display());
            let _ = writeln!(output, "      Requires: {}", join(&check.required));
            let _ = writeln!(output, "      With: {}", join(&check.with));
            let _ = writeln!(output, "      Without: {}", join(&check.without));
        }
        for file in &check.missing {
            let _ = writeln!(output, "      missing: {}", file);
        }
    }

    if !report.tools.is_empty() {
        let _ = writeln!(output, "\nTools:");
        for tool in &report.tools {
            let status = if tool.found { "[OK]" } else { "[!!]" };
            let optional = if tool.required { "" } else { " (optional)" };
            let _ = writeln!(output, "  {} {}{}", status, tool.name, optional);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stack::Stack;
    use crate::ops::prepare::prepare;
    use crate::test_support::{MockToolRunner, StackFixture};

    fn settings() -> StackSettings {
        StackSettings::new("/tmp/ilcstack-test.log")
    }

    #[test]
    fn test_check_reports_files_and_tools() {
        let fx = StackFixture::new();
        let lcio = fx.installed(ModuleId::Lcio).with_mode(Mode::Use);
        let gear = fx.declared(ModuleId::Gear).with_mode(Mode::Use);
        let marlin = fx.declared(ModuleId::Marlin).with_build_doc(true);
        let stack = Stack::new(vec![lcio, gear, marlin]).unwrap();

        let runner = MockToolRunner::new().without_tool("doxygen");
        let prepared = prepare(stack, &settings(), &runner).unwrap();
        let report = check(&prepared, &settings(), &runner);

        assert!(report.modules[0].is_complete());
        assert!(!report.modules[1].is_complete());
        assert_eq!(report.modules[2].with, vec![ModuleId::Gear]);
        assert!(!report.is_ok());

        assert!(report.tools.iter().any(|t| t.name == "cmake" && t.found && t.required));
        assert!(report
            .tools
            .contains(&ToolCheck { name: "doxygen".to_string(), found: false, required: false }));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::MissingFiles { module, .. } if module == "GEAR")));
    }

    #[test]
    fn test_format_report() {
        let fx = StackFixture::new();
        let lcio = fx.installed(ModuleId::Lcio).with_mode(Mode::Use);
        let stack = Stack::new(vec![lcio]).unwrap();
        let runner = MockToolRunner::new();
        let prepared = prepare(stack, &settings(), &runner).unwrap();

        let report = check(&prepared, &settings(), &runner);
        assert!(report.is_ok());

        let output = format_report(&report, true);
        assert!(output.contains("[OK] LCIO v01-00 (use)"));
        assert!(output.contains("Requires: -"));
        assert!(!output.contains("Tools:"));
    }
}
