//! `crucible deactivate`.

use clap::Args;
use crucible_core::Error;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct DeactivateArgs {
    /// Name of the extension package to deactivate
    pub extension: String,

    /// Name of the host package to deactivate it from
    pub host: String,

    /// Deactivate even if another activated extension still depends on this one
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(ctx: &Context, args: &DeactivateArgs) -> anyhow::Result<()> {
    let extension_spec = ctx
        .driver
        .services()
        .repo
        .resolve(&args.extension)
        .ok_or_else(|| Error::package(format!("no resolved spec on record for '{}'", args.extension)))?;
    let host_spec = ctx
        .driver
        .services()
        .repo
        .resolve(&args.host)
        .ok_or_else(|| Error::package(format!("no resolved spec on record for '{}'", args.host)))?;

    ctx.driver.deactivate(&extension_spec, &host_spec, args.force)?;
    output::success(&format!("{} deactivated from {}", extension_spec.name, host_spec.name));
    Ok(())
}
