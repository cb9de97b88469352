//! The fetch/stage/patch/install/register lifecycle driver, the sanity checker
//!, and the `Services`/`Repository` seam the driver is built against. The
//! dependency walker lives in `crucible-core::spec` since it's a property of `Spec` itself
//! rather than lifecycle-specific behavior.

pub mod build_env;
pub mod driver;
pub mod env;
pub mod recipe;
pub mod sanity;
pub mod services;

pub use build_env::{BuildContext, BuildEnv, ProcessBuildEnv, RunRequest};
pub use driver::{Driver, InstallOptions};
pub use env::EnvironmentModifications;
pub use recipe::Recipe;
pub use sanity::sanity_check_prefix;
pub use services::{RepoAdapter, Repository, Services};
