//! Overlapping chunk planning.
//!
//! Pure functions for splitting a recording's timeline into overlapping
//! windows. No I/O here - extraction happens later, per worker.

use thiserror::Error;

use crate::models::ChunkSpec;

/// Error for invalid planning parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("chunk duration must be positive and finite, got {0}")]
    InvalidChunkDuration(f64),

    #[error("overlap must satisfy 0 <= overlap < chunk duration, got {overlap_secs} for chunk duration {chunk_secs}")]
    InvalidOverlap { chunk_secs: f64, overlap_secs: f64 },

    #[error("source duration must be finite and non-negative, got {0}")]
    InvalidSourceDuration(f64),
}

/// Lazy, deterministic sequence of chunk windows.
///
/// Restartable: re-planning with the same arguments (or cloning the
/// sequence before iterating) yields the same windows. Start positions
/// are computed by multiplication, not accumulation, so they do not
/// drift over long recordings.
#[derive(Debug, Clone)]
pub struct ChunkSequence {
    total_secs: f64,
    chunk_secs: f64,
    step_secs: f64,
    overlap_secs: f64,
    next_index: usize,
}

impl Iterator for ChunkSequence {
    type Item = ChunkSpec;

    fn next(&mut self) -> Option<ChunkSpec> {
        let start = self.next_index as f64 * self.step_secs;
        if start >= self.total_secs {
            return None;
        }

        // The final window is clamped to the end of the source; if
        // nothing of it remains, the plan ends here.
        let duration = self.chunk_secs.min(self.total_secs - start);
        if duration <= 0.0 {
            return None;
        }

        let spec = ChunkSpec {
            index: self.next_index,
            start_secs: start,
            duration_secs: duration,
            overlap_secs: self.overlap_secs,
        };
        self.next_index += 1;
        Some(spec)
    }
}

/// Plan overlapping windows covering `[0, total_secs)`.
///
/// Consecutive windows start `chunk_secs - overlap_secs` apart, so each
/// shares `overlap_secs` with the next. A source no longer than one
/// chunk yields a single window spanning the whole source; a zero
/// duration yields an empty plan.
///
/// # Arguments
/// * `total_secs` - Source duration in seconds
/// * `chunk_secs` - Nominal window duration in seconds
/// * `overlap_secs` - Overlap between consecutive windows in seconds
pub fn plan_chunks(
    total_secs: f64,
    chunk_secs: f64,
    overlap_secs: f64,
) -> Result<ChunkSequence, PlanError> {
    if !chunk_secs.is_finite() || chunk_secs <= 0.0 {
        return Err(PlanError::InvalidChunkDuration(chunk_secs));
    }
    if !overlap_secs.is_finite() || overlap_secs < 0.0 || overlap_secs >= chunk_secs {
        return Err(PlanError::InvalidOverlap {
            chunk_secs,
            overlap_secs,
        });
    }
    if !total_secs.is_finite() || total_secs < 0.0 {
        return Err(PlanError::InvalidSourceDuration(total_secs));
    }

    Ok(ChunkSequence {
        total_secs,
        chunk_secs,
        step_secs: chunk_secs - overlap_secs,
        overlap_secs,
        next_index: 0,
    })
}
