//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// ilcstack - Build and wire the Marlin/ilcsoft module stack
#[derive(Parser)]
#[command(name = "ilcstack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (echoes build tool output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Stack file to use instead of the nearest ilcstack.toml
    #[arg(long, global = true, value_name = "FILE", env = "ILCSTACK_STACK")]
    pub stack: Option<PathBuf>,

    /// Output format for messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and install the modules of the stack
    Install(InstallArgs),

    /// Validate dependencies, build order and installed files
    Check(CheckArgs),

    /// Show what installing a module would do, without running anything
    Plan(ModuleArgs),

    /// Print the environment files of a module
    Env(EnvArgs),

    /// Refresh the package links of a module
    Link(ModuleArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// Only build these modules (repeatable)
    #[arg(short, long = "module", value_name = "NAME")]
    pub modules: Vec<String>,
}

#[derive(Args)]
pub struct CheckArgs {}

#[derive(Args)]
pub struct ModuleArgs {
    /// Module name, as written in the stack file
    pub module: String,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Module name, as written in the stack file
    pub module: String,

    /// Write the files into the module workspace instead of printing them
    #[arg(long)]
    pub write: bool,
}
