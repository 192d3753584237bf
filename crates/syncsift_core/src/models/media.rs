//! Source media description.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A probed source recording.
///
/// Produced by `extract::probe_source` before planning starts. The
/// container duration drives chunk planning; the stream basics are
/// informational and logged at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Path to the source file.
    pub path: PathBuf,

    /// Container duration in seconds.
    pub duration_secs: f64,

    /// Frame rate of the first video stream, if one was found.
    pub frame_rate: Option<f64>,

    /// Sample rate of the first audio stream, if one was found.
    pub audio_sample_rate: Option<u32>,
}

impl SourceMedia {
    /// Create a source description without probing.
    ///
    /// Mainly useful in tests; real sources come from `probe_source`.
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            frame_rate: None,
            audio_sample_rate: None,
        }
    }
}
