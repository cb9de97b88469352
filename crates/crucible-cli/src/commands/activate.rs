//! `crucible activate`.

use clap::Args;
use crucible_core::Error;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Name of the extension package to activate
    pub extension: String,

    /// Name of the host package to activate it into
    pub host: String,
}

pub fn run(ctx: &Context, args: &ActivateArgs) -> anyhow::Result<()> {
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

    ctx.driver.activate(&extension_spec, &host_spec)?;
    output::success(&format!("{} activated into {}", extension_spec.name, host_spec.name));
    Ok(())
}
