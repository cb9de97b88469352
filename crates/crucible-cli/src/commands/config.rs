//! `crucible config` — prints the fully resolved configuration.

use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub fn run(ctx: &Context, _args: &ConfigArgs) -> anyhow::Result<()> {
    output::header("resolved configuration");
    let settings = &ctx.settings;
    output::info(&format!("install_root: {}", settings.install_root.display()));
    output::info(&format!("mirror_dir: {}", settings.mirror_dir.display()));
    output::info(&format!("default_jobs: {}", settings.default_jobs));
    output::info(&format!("checksum_required: {}", settings.checksum_required));
    output::info(&format!("keep_prefix_default: {}", settings.keep_prefix_default));
    output::info(&format!("keep_stage_default: {}", settings.keep_stage_default));
    output::info(&format!("verbose_default: {}", settings.verbose_default));
    Ok(())
}
