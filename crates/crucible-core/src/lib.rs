//! Core data model and error taxonomy shared by every `crucible-*` crate.
//!
//! This crate owns the types the lifecycle engine reasons about — [`Spec`], [`Package`],
//! [`Version`], the stage/prefix data model — and the closed [`Error`] taxonomy every other
//! crate in the workspace propagates through `?`. It has no knowledge of fetching, staging,
//! patching, or installing; those are owned by the crates named after them.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod error;
pub mod json;
pub mod package;
pub mod sentinel;
pub mod spec;
pub mod version;

pub use error::{Error, ErrorCode, Result};
pub use package::{Package, PatchDescriptor, PatchSource, Resource, VersionMetadata};
pub use sentinel::Sentinel;
pub use spec::{DependencyKind, Spec};
pub use version::Version;
