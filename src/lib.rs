//! Blocking Rust client for the ASTR archive server REST API.
//!
//! Public API layers:
//! - [`AstrClient`]: authenticated JSON transport, file download and multipart upload.
//! - [`Browser`]: archive and category lookups returning [`Archive`] and [`Category`].
//! - [`ClientConfig`]: connection parameters, with `LIBASTR_*` environment fallback.
//! - [`ClientError`]: unified error type used by all operations.
//!
//! ```no_run
//! use astr_client::{ArchiveQuery, Browser};
//!
//! # fn main() -> Result<(), astr_client::ClientError> {
//! let browser = Browser::from_env()?;
//! let query = ArchiveQuery::new()
//!     .category("MOTOR CONTROL")
//!     .descriptor("robot_type", "NAO");
//! for archive in browser.get_archives_by_args(&query)? {
//!     archive.download("/tmp")?;
//! }
//! # Ok(())
//! # }
//! ```

mod archive;
mod browser;
mod category;
mod client;
mod config;
mod descriptor;
mod error;
mod query;

#[cfg(test)]
mod test_server;

/// Server-side archive snapshot and the request types that create or modify one.
pub use archive::{Archive, ArchiveUpdate, FileMetadata, MAX_UPLOAD_FILES, NewArchive};
/// Archive search and listing entry point.
pub use browser::Browser;
pub use category::Category;
/// Blocking authenticated transport.
pub use client::AstrClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT, EMAIL_ENV, TOKEN_ENV, URL_ENV};
pub use descriptor::Descriptor;
/// Error type returned by all client operations.
pub use error::ClientError;
pub use query::{ArchiveQuery, DESCRIPTOR_PREFIX};
