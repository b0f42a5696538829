//! ilcstack CLI - installer for the Marlin/ilcsoft module stack

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};
use ilcstack::util::context::StackFileNotFound;
use ilcstack::util::diagnostic::{self, suggestions, Diagnostic};
use ilcstack::util::shell::ColorChoice;
use ilcstack::util::{GlobalContext, Shell};
use ilcstack::InstallError;

fn main() {
    let cli = Cli::parse();
    let color = cli.color.parse().unwrap_or(ColorChoice::Auto);
    let shell = Shell::from_flags(
        cli.quiet,
        cli.verbose,
        color,
        cli.message_format == MessageFormat::Json,
    );

    if let Err(e) = run(cli, &shell) {
        report_error(&shell, &e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Shell) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ilcstack=debug")
    } else if cli.quiet || shell.is_json() {
        EnvFilter::new("ilcstack=error")
    } else {
        EnvFilter::new("ilcstack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let gctx = GlobalContext::new()?
        .with_stack_file(cli.stack)
        .with_verbose(cli.verbose);

    // Execute command
    match cli.command {
        Commands::Install(args) => commands::install::execute(args, &gctx, shell),
        Commands::Check(args) => commands::check::execute(args, &gctx, shell),
        Commands::Plan(args) => commands::plan::execute(args, &gctx, shell),
        Commands::Env(args) => commands::env::execute(args, &gctx, shell),
        Commands::Link(args) => commands::link::execute(args, &gctx, shell),
    }
}

fn report_error(shell: &Shell, e: &anyhow::Error) {
    if shell.is_json() {
        shell.error(format!("{:#}", e));
        return;
    }
    if let Some(err) = e.downcast_ref::<InstallError>() {
        diagnostic::emit(&err.to_diagnostic(), shell.use_color());
    } else if let Some(err) = e.downcast_ref::<StackFileNotFound>() {
        let diag = Diagnostic::error(err.to_string()).with_suggestion(suggestions::NO_STACK_FILE);
        diagnostic::emit(&diag, shell.use_color());
    } else {
        eprintln!("error: {:#}", e);
    }
}
