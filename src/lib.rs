//! Path-addressed file storage over the Box API.
//!
//! Box addresses files and folders only by opaque ids. [`BoxProvider`]
//! accepts slash-delimited virtual paths, walks the folder tree to find the
//! ids, and implements metadata, download, upload, delete and revision
//! listing on top of that.

pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod vfs;

pub use config::{Credentials, ProviderConfig, Settings};
pub use error::{ProviderError, Result};
pub use providers::{BoxProvider, StorageProvider, UploadOutcome};
