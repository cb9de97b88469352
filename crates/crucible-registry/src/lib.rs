//! Install layout and installed-spec registry: a concrete, filesystem-backed
//! implementation of the layout/registry half of the lifecycle driver's `Services` bundle.

pub mod layout;
pub mod registry;

pub use layout::{ExtensionRecord, InstallLayout};
pub use registry::{InstalledRecord, Registry};
