//! `crucible install`.

use std::path::PathBuf;

use clap::Args;
use crucible_core::Error;
use crucible_lifecycle::InstallOptions;
use serde::Serialize;

use crate::context::Context;
use crate::output;

#[derive(Serialize)]
struct InstallResult<'a> {
    name: &'a str,
    version: &'a str,
    prefix: String,
    elapsed_ms: u128,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Name of the package to install, resolved against the spec repository
    pub name: String,

    /// Retain the prefix if the install fails, for post-mortem inspection
    #[arg(long)]
    pub keep_prefix: bool,

    /// Retain the stage directory after a successful install
    #[arg(long)]
    pub keep_stage: bool,

    /// Install this package only, skipping its dependencies
    #[arg(long)]
    pub ignore_deps: bool,

    /// Stage the source but skip applying patches
    #[arg(long)]
    pub skip_patch: bool,

    /// Tee build output to the terminal
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the number of parallel build jobs
    #[arg(short = 'j', long)]
    pub jobs: Option<u32>,

    /// Skip the real build and populate a stub prefix, for exercising the driver without a
    /// real toolchain
    #[arg(long)]
    pub fake: bool,
}

pub fn run(ctx: &Context, args: &InstallArgs) -> anyhow::Result<()> {
    let spec = ctx
        .driver
        .services()
        .repo
        .resolve(&args.name)
        .ok_or_else(|| Error::package(format!("no resolved spec on record for '{}'", args.name)))?;

    let options = InstallOptions {
        keep_prefix: args.keep_prefix,
        keep_stage: args.keep_stage,
        ignore_deps: args.ignore_deps,
        skip_patch: args.skip_patch,
        verbose: args.verbose,
        make_jobs: args.jobs,
        fake: args.fake,
    };

    if !ctx.json {
        output::header(&format!("installing {} {}", spec.name, spec.version.as_str()));
    }
    let start = std::time::Instant::now();
    ctx.driver.do_install(&spec, &options)?;
    let elapsed = start.elapsed();

    let prefix: PathBuf = ctx.driver.services().layout.path_for_spec(&spec);

    if ctx.json {
        output::emit_json(&InstallResult {
            name: &spec.name,
            version: spec.version.as_str(),
            prefix: prefix.display().to_string(),
            elapsed_ms: elapsed.as_millis(),
        });
    } else {
        output::success(&format!("{} installed in {}", spec.name, output::format_duration(elapsed)));
        output::info(&format!("prefix: {}", prefix.display()));
    }
    Ok(())
}
