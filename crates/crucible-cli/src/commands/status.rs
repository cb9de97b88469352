//! `crucible status` — reports whether a package is installed and, if so, where, plus its
//! currently activated extensions.

use clap::Args;
use crucible_core::Error;
use serde::Serialize;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Name of the package to inspect
    pub name: String,
}

#[derive(Serialize)]
struct StatusResult<'a> {
    name: &'a str,
    version: &'a str,
    installed: bool,
    prefix: Option<String>,
    installed_at: Option<String>,
    direct_dependencies: usize,
    active_extensions: Vec<String>,
}

pub fn run(ctx: &Context, args: &StatusArgs) -> anyhow::Result<()> {
    let spec = ctx
        .driver
        .services()
        .repo
        .resolve(&args.name)
        .ok_or_else(|| Error::package(format!("no resolved spec on record for '{}'", args.name)))?;

    let services = ctx.driver.services();
    if !services.layout.check_installed(&spec) {
        if ctx.json {
            output::emit_json(&StatusResult {
                name: &spec.name,
                version: spec.version.as_str(),
                installed: false,
                prefix: None,
                installed_at: None,
                direct_dependencies: 0,
                active_extensions: Vec::new(),
            });
        } else {
            output::warning(&format!("{} is not installed", spec.name));
        }
        return Ok(());
    }

    let prefix = services.layout.path_for_spec(&spec);
    let record = services.registry.get(&spec.dag_hash)?;
    let extensions = services.layout.extension_map(&spec)?;

    if ctx.json {
        output::emit_json(&StatusResult {
            name: &spec.name,
            version: spec.version.as_str(),
            installed: true,
            prefix: Some(prefix.display().to_string()),
            installed_at: record.as_ref().map(|r| r.installed_at.clone()),
            direct_dependencies: record.map_or(0, |r| r.dependency_dag_hashes.len()),
            active_extensions: extensions.keys().cloned().collect(),
        });
        return Ok(());
    }

    output::success(&format!("{} {} installed at {}", spec.name, spec.version.as_str(), prefix.display()));

    if let Some(record) = record {
        output::info(&format!("installed at {}", record.installed_at));
        if !record.dependency_dag_hashes.is_empty() {
            output::info(&format!("{} direct dependencies recorded", record.dependency_dag_hashes.len()));
        }
    }

    if extensions.is_empty() {
        output::info("no extensions activated");
    } else {
        for (name, record) in &extensions {
            output::info(&format!("extension active: {name} {}", record.version));
        }
    }

    Ok(())
}
