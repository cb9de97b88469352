//! Layered configuration loader: built-in defaults merged, field-by-field,
//! with an optional system file, an optional user file, an optional project file, `CRUCIBLE_*`
//! environment variables, and CLI overrides — ascending precedence in that order.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ConfigSource};
pub use settings::{PartialSettings, Settings};
