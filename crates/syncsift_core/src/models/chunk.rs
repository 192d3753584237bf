//! Chunk windows produced by the planner.

use serde::{Deserialize, Serialize};

/// One planned time window of the source recording.
///
/// Windows overlap: each chunk shares its last `overlap_secs` with the
/// start of the next one, so no sync event can fall on a hard boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSpec {
    /// Zero-based position in the plan.
    pub index: usize,

    /// Window start in seconds from the start of the source.
    pub start_secs: f64,

    /// Window duration in seconds. The final window may be shorter.
    pub duration_secs: f64,

    /// Overlap shared with the next window, in seconds.
    pub overlap_secs: f64,
}

impl ChunkSpec {
    /// Exclusive end of the window in seconds.
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Deterministic, zero-padded name derived from the index.
    ///
    /// Names sort in plan order for up to 1000 chunks; beyond that the
    /// padding widens naturally.
    pub fn name(&self) -> String {
        format!("chunk_{:03}", self.index)
    }
}
