//! Object storage and on-disk layout for the recut editing service.

pub mod client;
pub mod error;
pub mod layout;

pub use client::{ObjectStorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use layout::StorageLayout;
