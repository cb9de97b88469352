//! A [`Recipe`] driven entirely by data: the build is a declared sequence of
//! configure/make/cmake/run phases, read off a [`PackageDescriptor`](super::descriptor::PackageDescriptor)
//! instead of compiled into a recipe type. This is what lets [`super::FileRepository`] hand the
//! driver a working [`Recipe`] for any package describable as a sequence of shell-outs, without
//! this engine hosting a scripting language of its own.

use std::path::PathBuf;

use crucible_core::Result;
use crucible_lifecycle::build_env::BuildContext;
use crucible_lifecycle::recipe::Recipe;

use super::descriptor::PhaseFile;

#[derive(Debug, Clone)]
pub struct ShellRecipe {
    phases: Vec<PhaseFile>,
    patch_target: PathBuf,
}

impl ShellRecipe {
    #[must_use]
    pub fn new(phases: Vec<PhaseFile>, patch_target: PathBuf) -> Self {
        Self { phases, patch_target }
    }
}

impl Recipe for ShellRecipe {
    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        for phase in &self.phases {
            match phase {
                PhaseFile::Configure { args } => {
                    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                    ctx.configure(&refs)?;
                }
                PhaseFile::Make { args } => {
                    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                    ctx.make(&refs)?;
                }
                PhaseFile::Cmake { args } => {
                    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                    ctx.cmake(&refs)?;
                }
                PhaseFile::Run { program, args } => {
                    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                    ctx.run(program, &refs)?;
                }
            }
        }
        Ok(())
    }

    fn patch_target_file(&self) -> PathBuf {
        self.patch_target.clone()
    }
}
