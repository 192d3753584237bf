//! Data models for syncsift.
//!
//! This module contains the core data structures used throughout the
//! pipeline:
//! - Source media description (probed duration, stream basics)
//! - Chunk windows produced by the planner
//! - Sync assessments, thresholds, presets, and verdicts

mod chunk;
mod media;
mod quality;

// Re-export all public types
pub use chunk::ChunkSpec;
pub use media::SourceMedia;
pub use quality::{
    QualityThreshold, QualityVerdict, SyncAssessment, ThresholdPreset, TrackScore, VerdictReason,
};
