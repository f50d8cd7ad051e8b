//! Generation and render worker.
//!
//! This crate provides:
//! - Concurrent asset fan-out with footage fallback
//! - Topic-to-EDL orchestration and dispatch
//! - The EDL render pipeline and its FFmpeg backend
//! - A Redis render-queue consumer
//! - Tracing, metrics and environment configuration for the binaries

pub mod config;
pub mod consumer;
pub mod error;
pub mod fanout;
pub mod generate;
pub mod logging;
pub mod metrics;
pub mod render;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{DispatchMode, WorkerConfig};
pub use consumer::RenderConsumer;
pub use error::{WorkerError, WorkerResult};
pub use fanout::{AssetFanout, FanoutReport, SlotFailure};
pub use generate::{DispatchStatus, GenerationOutcome, Generator};
pub use logging::{init_tracing, JobLogger};
pub use render::{
    AssetFetcher, FfmpegBackend, MediaBackend, RenderOutcome, RenderPipeline, RenderStage, SkippedClip,
};
