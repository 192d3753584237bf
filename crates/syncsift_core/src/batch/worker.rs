//! Per-chunk processing: extract, score, classify, place.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use crate::classify::classify;
use crate::extract::ArtifactExtractor;
use crate::models::{ChunkSpec, QualityThreshold, QualityVerdict, SourceMedia, SyncAssessment};
use crate::oracle::SyncOracle;
use crate::organize::{OutputOrganizer, PlacedChunk};
use crate::report::ChunkOutcome;

/// Shared, read-only state every worker sees.
pub(super) struct ChunkContext<'a> {
    pub source: &'a SourceMedia,
    pub extractor: &'a dyn ArtifactExtractor,
    pub oracle: &'a dyn SyncOracle,
    pub organizer: Option<&'a OutputOrganizer>,
    pub threshold: &'a QualityThreshold,
    pub scratch_root: &'a Path,
    pub keep_scratch: bool,
}

/// Run one chunk through the full pipeline and produce its outcome.
///
/// Failures become a `ProcessingFailed` outcome instead of propagating,
/// so one bad chunk never takes down the batch.
pub(super) fn process_chunk(ctx: &ChunkContext<'_>, chunk: &ChunkSpec) -> ChunkOutcome {
    let started = Instant::now();
    let name = chunk.name();
    let scratch = ctx.scratch_root.join(&name);

    let result = run_chunk(ctx, chunk, &name, &scratch);

    if !ctx.keep_scratch && scratch.exists() {
        if let Err(e) = fs::remove_dir_all(&scratch) {
            warn!("could not remove scratch dir {}: {}", scratch.display(), e);
        }
    }

    let processing_secs = started.elapsed().as_secs_f64();
    match result {
        Ok((assessment, verdict, placed)) => ChunkOutcome {
            spec: chunk.clone(),
            assessment,
            verdict,
            placed,
            processing_secs,
            error: None,
        },
        Err(message) => {
            warn!("{}: {}", name, message);
            ChunkOutcome::failed(chunk.clone(), processing_secs, message)
        }
    }
}

fn run_chunk(
    ctx: &ChunkContext<'_>,
    chunk: &ChunkSpec,
    name: &str,
    scratch: &Path,
) -> Result<(SyncAssessment, QualityVerdict, Option<PlacedChunk>), String> {
    fs::create_dir_all(scratch)
        .map_err(|e| format!("could not create scratch dir {}: {}", scratch.display(), e))?;

    let artifacts = ctx
        .extractor
        .extract(ctx.source, chunk, scratch)
        .map_err(|e| format!("extraction failed: {}", e))?;
    debug!("{}: extracted clip {}", name, artifacts.clip.display());

    let review = ctx
        .oracle
        .assess(name, &artifacts.clip, &artifacts.audio, scratch)
        .map_err(|e| format!("sync scoring failed: {}", e))?;

    let verdict = classify(&review.assessment, ctx.threshold);
    debug!(
        "{}: {} ({})",
        name,
        if verdict.accepted { "accepted" } else { "rejected" },
        verdict.reason
    );

    let placed = match ctx.organizer {
        Some(organizer) => Some(
            organizer
                .place(name, &verdict, &artifacts, &review.outputs)
                .map_err(|e| format!("organizing failed: {}", e))?,
        ),
        None => None,
    };

    Ok((review.assessment, verdict, placed))
}
