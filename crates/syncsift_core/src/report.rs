//! Batch outcomes and the persisted filter report.
//!
//! Workers record one `ChunkOutcome` per processed chunk into the
//! `ResultAggregator`; once the batch completes the outcomes become a
//! `BatchReport`, written atomically as `sync_filter_results.json` in
//! the output root.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    ChunkSpec, QualityThreshold, QualityVerdict, SyncAssessment, VerdictReason,
};
use crate::organize::PlacedChunk;

/// File name of the batch report inside the output root.
pub const REPORT_FILE_NAME: &str = "sync_filter_results.json";

/// Error from persisting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything known about one processed chunk.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    /// The planned window this outcome is for.
    pub spec: ChunkSpec,

    /// What the oracle concluded.
    pub assessment: SyncAssessment,

    /// The classification decision.
    pub verdict: QualityVerdict,

    /// Where the artifacts were placed, when organizing ran.
    pub placed: Option<PlacedChunk>,

    /// Wall-clock processing time for this chunk in seconds.
    pub processing_secs: f64,

    /// Failure detail when the chunk never completed processing.
    pub error: Option<String>,
}

impl ChunkOutcome {
    /// Outcome for a chunk whose processing failed partway through.
    pub fn failed(spec: ChunkSpec, processing_secs: f64, error: impl Into<String>) -> Self {
        Self {
            spec,
            assessment: SyncAssessment::ProcessingFailed,
            verdict: QualityVerdict::reject(VerdictReason::AnalysisFailed),
            placed: None,
            processing_secs,
            error: Some(error.into()),
        }
    }
}

/// Thread-safe outcome collection.
///
/// The lock is held only for the push, never while a chunk is being
/// processed or the report is being written.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    outcomes: Mutex<Vec<ChunkOutcome>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished chunk.
    pub fn record(&self, outcome: ChunkOutcome) {
        self.outcomes.lock().push(outcome);
    }

    /// Number of outcomes recorded so far.
    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the collected outcomes, sorted by chunk index.
    pub fn into_outcomes(self) -> Vec<ChunkOutcome> {
        let mut outcomes = self.outcomes.into_inner();
        outcomes.sort_by_key(|o| o.spec.index);
        outcomes
    }
}

/// One chunk entry in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEntry {
    /// Plan position.
    pub index: usize,

    /// Chunk name (`chunk_000`, ...).
    pub name: String,

    /// Window start in seconds.
    pub start_secs: f64,

    /// Window end in seconds.
    pub end_secs: f64,

    /// Best-track offset in frames, when the chunk was scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_frames: Option<i64>,

    /// Best-track confidence, when the chunk was scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Whether the chunk passed the quality gates.
    pub accepted: bool,

    /// The deciding gate.
    pub reason: VerdictReason,

    /// Final paths of the placed artifacts (empty in report-only mode).
    pub artifact_paths: Vec<PathBuf>,

    /// Wall-clock processing time in seconds.
    pub processing_secs: f64,

    /// Failure detail for chunks that never completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The persisted batch report.
///
/// Totals are disjoint: `accepted` passed, `rejected` failed a quality
/// gate, `no_faces_detected` had no usable face track, and
/// `processing_failed` never completed. They sum to `total_chunks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// The source recording the batch was planned from.
    pub source: PathBuf,

    /// When the report was generated (RFC 3339, local time).
    pub generated_at: String,

    /// The gates the batch was filtered with.
    pub filter_settings: QualityThreshold,

    pub total_chunks: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub no_faces_detected: usize,
    pub processing_failed: usize,

    /// Per-chunk entries, sorted ascending by index.
    pub chunks: Vec<ChunkEntry>,
}

/// Assemble the final report from per-chunk outcomes.
///
/// Entries are sorted by chunk index and the totals are derived from
/// the entries, never counted separately.
pub fn build_report(
    source: &Path,
    threshold: &QualityThreshold,
    outcomes: Vec<ChunkOutcome>,
) -> BatchReport {
    let mut chunks: Vec<ChunkEntry> = outcomes.into_iter().map(chunk_entry).collect();
    chunks.sort_by_key(|c| c.index);

    let accepted = chunks
        .iter()
        .filter(|c| c.reason == VerdictReason::Accepted)
        .count();
    let rejected = chunks
        .iter()
        .filter(|c| matches!(c.reason, VerdictReason::LowConfidence | VerdictReason::HighOffset))
        .count();
    let no_faces_detected = chunks
        .iter()
        .filter(|c| c.reason == VerdictReason::NoFace)
        .count();
    let processing_failed = chunks
        .iter()
        .filter(|c| c.reason == VerdictReason::AnalysisFailed)
        .count();

    BatchReport {
        source: source.to_path_buf(),
        generated_at: chrono::Local::now().to_rfc3339(),
        filter_settings: *threshold,
        total_chunks: chunks.len(),
        accepted,
        rejected,
        no_faces_detected,
        processing_failed,
        chunks,
    }
}

fn chunk_entry(outcome: ChunkOutcome) -> ChunkEntry {
    let (offset_frames, confidence) = match outcome.assessment.score() {
        Some((offset, confidence)) => (Some(offset), Some(confidence)),
        None => (None, None),
    };

    ChunkEntry {
        index: outcome.spec.index,
        name: outcome.spec.name(),
        start_secs: outcome.spec.start_secs,
        end_secs: outcome.spec.end_secs(),
        offset_frames,
        confidence,
        accepted: outcome.verdict.accepted,
        reason: outcome.verdict.reason,
        artifact_paths: outcome.placed.map(|p| p.files).unwrap_or_default(),
        processing_secs: outcome.processing_secs,
        error: outcome.error,
    }
}

/// Write the report as pretty JSON, atomically (temp file + rename).
pub fn save_report(report: &BatchReport, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(report)?;
    let temp_path = path.with_extension("json.tmp");

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ReportError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
