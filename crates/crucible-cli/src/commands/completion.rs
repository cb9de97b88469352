//! `crucible completion` — generates a shell completion script via `clap_complete`.

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use super::Cli;

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate a completion script for
    pub shell: Shell,
}

pub fn run(args: &CompletionArgs) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, name, &mut std::io::stdout());
}
