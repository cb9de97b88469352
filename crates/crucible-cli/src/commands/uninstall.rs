//! `crucible uninstall`.

use clap::Args;
use crucible_core::Error;
use serde::Serialize;

use crate::context::Context;
use crate::output;

#[derive(Serialize)]
struct UninstallResult<'a> {
    name: &'a str,
    uninstalled: bool,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Name of the package to uninstall, resolved against the spec repository
    pub name: String,

    /// Uninstall even if other installed packages still depend on this one
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(ctx: &Context, args: &UninstallArgs) -> anyhow::Result<()> {
    let spec = ctx
        .driver
        .services()
        .repo
        .resolve(&args.name)
        .ok_or_else(|| Error::package(format!("no resolved spec on record for '{}'", args.name)))?;

    ctx.driver.do_uninstall(&spec, args.force)?;

    if ctx.json {
        output::emit_json(&UninstallResult { name: &spec.name, uninstalled: true });
    } else {
        output::success(&format!("{} uninstalled", spec.name));
    }
    Ok(())
}
