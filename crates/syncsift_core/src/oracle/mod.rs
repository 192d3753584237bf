//! Sync-scoring oracle boundary.
//!
//! The scoring model itself is an external pipeline (SyncNet-style)
//! invoked per chunk; this module defines the seam the batch workers
//! call through, plus the process adapter in `syncnet`.
//!
//! "No face detected" is a result, never an error: `assess` only errors
//! for infrastructure failures (spawn, crash, timeout, unparseable
//! output), which the worker records as a failed chunk.

mod syncnet;

pub use syncnet::SyncNetOracle;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{SyncAssessment, TrackScore};

/// Error from the scoring pipeline infrastructure.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("scorer failed with exit code {exit_code}: {message}")]
    ScorerFailed { exit_code: i32, message: String },

    #[error(transparent)]
    Command(#[from] crate::process::CommandError),

    #[error("malformed offsets record {path}: {message}")]
    MalformedOffsets { path: PathBuf, message: String },

    #[error("i/o error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Scorer side outputs worth keeping with the chunk.
#[derive(Debug, Clone, Default)]
pub struct OracleOutputs {
    /// Raw per-track offsets record.
    pub offsets_record: Option<PathBuf>,

    /// Cropped face-track clips.
    pub cropped_tracks: Vec<PathBuf>,

    /// Chunk clip annotated with face bounding boxes.
    pub annotated_clip: Option<PathBuf>,
}

/// Everything the oracle learned about one chunk.
#[derive(Debug, Clone)]
pub struct OracleReview {
    /// The distilled assessment for classification.
    pub assessment: SyncAssessment,

    /// Raw per-track records behind the assessment.
    pub tracks: Vec<TrackScore>,

    /// Side outputs to preserve next to the clip.
    pub outputs: OracleOutputs,
}

/// Boundary to the external sync scorer.
pub trait SyncOracle: Send + Sync {
    /// Score one chunk from its clip and extracted audio.
    ///
    /// `work_dir` is the chunk's private scratch directory; the adapter
    /// may let the scorer write whatever it wants there.
    fn assess(
        &self,
        chunk_name: &str,
        clip: &Path,
        audio: &Path,
        work_dir: &Path,
    ) -> OracleResult<OracleReview>;
}
