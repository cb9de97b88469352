//! Entry point: parse args, initialize tracing from verbosity, build a [`Context`], dispatch,
//! and print a uniform error on failure. Synchronous throughout — no tokio runtime, matching
//! this engine's blocking design.

mod commands;
mod context;
mod output;
mod repo;

use clap::Parser;
use commands::{Cli, Commands};
use context::Context;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("CRUCIBLE_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Commands::Completion(args) = &cli.command {
        commands::completion::run(args);
        return;
    }

    if let Err(err) = run(&cli) {
        output::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = Context::new(
        &cli.project_dir(),
        cli.recipes_dir.clone(),
        cli.specs_dir.clone(),
        cli.cli_overrides(),
        cli.json,
    )?;

    match &cli.command {
        Commands::Install(args) => commands::install::run(&ctx, args),
        Commands::Uninstall(args) => commands::uninstall::run(&ctx, args),
        Commands::Activate(args) => commands::activate::run(&ctx, args),
        Commands::Deactivate(args) => commands::deactivate::run(&ctx, args),
        Commands::Status(args) => commands::status::run(&ctx, args),
        Commands::Config(args) => commands::config::run(&ctx, args),
        Commands::Completion(_) => unreachable!("handled before Context construction"),
    }
}
