//! Object storage for job artifacts.
//!
//! This crate provides:
//! - The `ObjectStore` trait (put/get/exists plus file helpers)
//! - Cloudflare R2 and local-filesystem implementations
//! - The `jobs/{jobId}/...` key layout
//! - Job status derived from artifact existence

pub mod backend;
pub mod client;
pub mod error;
pub mod local;
pub mod paths;
pub mod status;
pub mod store;

pub use backend::StorageConfig;
pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use local::{LocalStore, LocalStoreConfig};
pub use paths::JobPaths;
pub use status::job_status;
pub use store::{content_type_for, validate_key, ObjectStore};
