//! Ordered multi-source fetch composite and URL nearest-version resolution.
//!
//! A [`composite::FetcherComposite`] sequences a root [`strategies::Fetcher`] with one per
//! declared resource; [`url_resolver::UrlResolver`] picks a concrete URL for an unlisted
//! version by walking the package's explicit version-to-URL table.

pub mod archive;
pub mod composite;
pub mod factory;
pub mod source;
pub mod strategies;
pub mod url_resolver;

pub use composite::{FetchEntry, FetcherComposite, LabeledOutcome};
pub use factory::{DefaultFetchFactory, FetchFactory};
pub use source::{Source, SourceType, validate_package_url};
pub use strategies::{FetchOutcome, Fetcher, GitFetcher, PathFetcher, UrlFetcher};
pub use url_resolver::UrlResolver;
