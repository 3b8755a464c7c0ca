//! The cache/versioning core: entry store, version counters and the
//! one-time-secret manager.

pub(crate) mod lock;
mod secrets;
mod store;
mod version;

pub use secrets::{SECRET_TTL, SecretsManager};
pub use store::EntryStore;
pub use version::{DB_VERSION_OPTION, HTML_VERSION_OPTION, VersionCounter};
