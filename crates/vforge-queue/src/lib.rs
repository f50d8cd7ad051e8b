//! Render job dispatch.
//!
//! This crate provides:
//! - The `JobDispatcher` hand-off interface
//! - A Redis Streams render queue with deduplication
//! - A subprocess dispatcher that launches the render worker directly

pub mod dispatcher;
pub mod error;
pub mod job;
pub mod queue;

pub use dispatcher::{JobDispatcher, ProcessDispatcher, EDL_LOCATION_ENV, JOB_ID_ENV};
pub use error::{QueueError, QueueResult};
pub use job::RenderJob;
pub use queue::{decode_entry, QueueConfig, RenderQueue};
