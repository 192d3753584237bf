//! Per-chunk artifact extraction.
//!
//! Each planned window is handed to an `ArtifactExtractor`, which
//! produces the two artifacts the sync scorer consumes: the cut video
//! clip for that window and its audio as a mono 16 kHz WAV. Probing of
//! the source (duration, stream basics) also lives here.

mod ffmpeg;
mod probe;

pub use ffmpeg::FfmpegExtractor;
pub use probe::probe_source;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{ChunkSpec, SourceMedia};

/// Audio sample rate the sync scorer requires. Not configurable.
pub const ORACLE_SAMPLE_RATE: u32 = 16_000;

/// Audio channel count the sync scorer requires. Not configurable.
pub const ORACLE_CHANNELS: u32 = 1;

/// Error from probing or extracting chunk artifacts.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error(transparent)]
    Command(#[from] crate::process::CommandError),

    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    #[error("expected output missing after extraction: {0}")]
    OutputMissing(PathBuf),
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Artifacts produced for one chunk.
#[derive(Debug, Clone)]
pub struct ChunkArtifacts {
    /// The cut clip for the window.
    pub clip: PathBuf,

    /// Mono 16 kHz WAV covering the same window.
    pub audio: PathBuf,
}

/// Boundary to the tool that cuts clips and extracts audio.
///
/// Implementations must be safe to call from several workers at once;
/// each call gets its own scratch directory.
pub trait ArtifactExtractor: Send + Sync {
    /// Produce the clip and audio for `chunk` inside `scratch_dir`.
    fn extract(
        &self,
        source: &SourceMedia,
        chunk: &ChunkSpec,
        scratch_dir: &Path,
    ) -> ExtractResult<ChunkArtifacts>;
}
