//! Scoped staging directories for the root archive and its declared resources, plus the archive extraction dispatch (tar/tar.gz/tar.bz2/tar.xz/zip) they sit on top
//! of.

pub mod archive;
pub mod stage;

pub use archive::{ArchiveType, ExtractionResult};
pub use stage::{ScopedStage, Stage, StageComposite};
