//! Shared data models for the VForge pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests and output options
//! - Scene scripts and resolved assets
//! - The Edit Decision List (EDL) and its builder
//! - Job identifiers and status

pub mod asset;
pub mod edl;
pub mod edl_builder;
pub mod effects;
pub mod error;
pub mod job;
pub mod request;
pub mod script;

// Re-export common types
pub use asset::{is_path_safe_id, Asset, AssetKind, AssetMap, AssetRole};
pub use edl::{
    Clip, Edl, EdlMetadata, OutputSettings, RenderSettings, Timeline, Track, TrackKind,
    TIMING_EPSILON,
};
pub use edl_builder::{build_edl, DroppedScene, EdlBuild, EdlBuilder};
pub use effects::{Easing, Effect, KenBurnsParams, Transition, TransitionKind, Transitions};
pub use error::{ModelError, ModelResult};
pub use job::{JobId, JobStatus};
pub use request::{GenerateRequest, OutputOptions};
pub use script::{Scene, SceneEffects, Script, VisualType};
