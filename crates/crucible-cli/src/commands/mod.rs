//! CLI commands, built on a standard clap-derive
//! `Cli`/`Commands` shape, narrowed to the operations this engine actually exposes: no
//! resolver-backed `install`/`update`/`require` against a lockfile, just the
//! lifecycle driver's own surface against already-concrete specs read from disk.

pub mod activate;
pub mod completion;
pub mod config;
pub mod deactivate;
pub mod install;
pub mod status;
pub mod uninstall;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(author = "Crucible Contributors")]
#[command(version)]
#[command(about = "Lifecycle engine for a source-based package manager", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use the specified directory as the project root (config file lookup)
    #[arg(short = 'd', long = "working-dir", global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Directory of per-package recipe JSON documents
    #[arg(long, global = true, value_name = "DIR", default_value = "recipes")]
    pub recipes_dir: PathBuf,

    /// Directory of per-package concrete spec JSON documents
    #[arg(long, global = true, value_name = "DIR", default_value = "specs")]
    pub specs_dir: PathBuf,

    /// Override the install root
    #[arg(long, global = true, value_name = "DIR")]
    pub install_root: Option<PathBuf>,

    /// Bypass the checksum-required policy: fetch proceeds even with no checksum on record
    #[arg(long, global = true)]
    pub no_checksum: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Emit machine-readable JSON result fields on stdout instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Installs a package and its dependencies
    Install(install::InstallArgs),

    /// Uninstalls a package
    Uninstall(uninstall::UninstallArgs),

    /// Activates an extension into a host package's prefix
    Activate(activate::ActivateArgs),

    /// Deactivates an extension from a host package's prefix
    Deactivate(deactivate::DeactivateArgs),

    /// Shows whether a package is installed and where
    Status(status::StatusArgs),

    /// Shows the resolved configuration
    Config(config::ConfigArgs),

    /// Generates a shell completion script
    Completion(completion::CompletionArgs),
}

impl Cli {
    #[must_use]
    pub fn project_dir(&self) -> PathBuf {
        self.working_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    #[must_use]
    pub fn cli_overrides(&self) -> crucible_config::PartialSettings {
        crucible_config::PartialSettings {
            install_root: self.install_root.clone(),
            checksum_required: self.no_checksum.then_some(false),
            ..Default::default()
        }
    }
}
