//! Batch scheduling across a bounded worker pool.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::extract::ArtifactExtractor;
use crate::models::{ChunkSpec, QualityThreshold, SourceMedia};
use crate::oracle::SyncOracle;
use crate::organize::{OrganizeError, OutputOrganizer};
use crate::report::{build_report, BatchReport, ResultAggregator};

use super::worker::{process_chunk, ChunkContext};

/// Error that aborts a whole batch.
///
/// Per-chunk failures never surface here; they become
/// `processing_failed` entries in the report instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("batch cancelled after {completed} of {planned} chunks")]
    Cancelled { completed: usize, planned: usize },

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("could not create scratch root {path}: {source}")]
    ScratchRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cooperative cancellation flag shared between the scheduler and its
/// caller.
///
/// Cancelling stops new chunks from being scheduled; chunks already in
/// flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Drives planned chunks through extraction, scoring, classification
/// and placement on a pool of worker threads.
pub struct BatchScheduler {
    extractor: Box<dyn ArtifactExtractor>,
    oracle: Box<dyn SyncOracle>,
    organizer: Option<OutputOrganizer>,
    threshold: QualityThreshold,
    scratch_root: PathBuf,
    max_workers: usize,
    keep_scratch: bool,
    cancel: CancelHandle,
}

impl BatchScheduler {
    pub fn new(
        extractor: Box<dyn ArtifactExtractor>,
        oracle: Box<dyn SyncOracle>,
        threshold: QualityThreshold,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            oracle,
            organizer: None,
            threshold,
            scratch_root: scratch_root.into(),
            max_workers: 2,
            keep_scratch: false,
            cancel: CancelHandle::new(),
        }
    }

    /// Place artifacts into quality partitions after classification.
    ///
    /// Without an organizer the batch runs report-only: everything is
    /// scored and classified but nothing is moved out of scratch.
    pub fn with_organizer(mut self, organizer: OutputOrganizer) -> Self {
        self.organizer = Some(organizer);
        self
    }

    /// Upper bound on concurrent workers. The pool never exceeds the
    /// number of planned chunks.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Keep per-chunk scratch directories after processing.
    pub fn with_keep_scratch(mut self, keep_scratch: bool) -> Self {
        self.keep_scratch = keep_scratch;
        self
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling this scheduler's runs.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Process every planned chunk and assemble the batch report.
    ///
    /// Chunks are handed out in plan order; completion order depends on
    /// the workers, so outcomes are re-sorted before the report is
    /// built. A cancelled run returns `BatchError::Cancelled` and
    /// writes no report.
    pub fn run(
        &self,
        source: &SourceMedia,
        chunks: Vec<ChunkSpec>,
    ) -> Result<BatchReport, BatchError> {
        if self.max_workers == 0 {
            return Err(BatchError::InvalidWorkerCount);
        }
        if let Some(organizer) = &self.organizer {
            organizer.ensure_partitions()?;
        }
        fs::create_dir_all(&self.scratch_root).map_err(|e| BatchError::ScratchRoot {
            path: self.scratch_root.clone(),
            source: e,
        })?;

        let planned = chunks.len();
        let worker_count = self.max_workers.min(planned.max(1));
        info!(
            "processing {} chunks from {} with {} workers",
            planned,
            source.path.display(),
            worker_count
        );

        let queue: Mutex<VecDeque<ChunkSpec>> = Mutex::new(chunks.into());
        let aggregator = ResultAggregator::new();
        let ctx = ChunkContext {
            source,
            extractor: self.extractor.as_ref(),
            oracle: self.oracle.as_ref(),
            organizer: self.organizer.as_ref(),
            threshold: &self.threshold,
            scratch_root: &self.scratch_root,
            keep_scratch: self.keep_scratch,
        };

        thread::scope(|scope| {
            for worker_id in 0..worker_count {
                let queue = &queue;
                let aggregator = &aggregator;
                let ctx = &ctx;
                let cancel = &self.cancel;
                scope.spawn(move || worker_loop(worker_id, queue, aggregator, ctx, cancel));
            }
        });

        let completed = aggregator.len();
        if self.cancel.is_cancelled() {
            return Err(BatchError::Cancelled { completed, planned });
        }

        let report = build_report(&source.path, &self.threshold, aggregator.into_outcomes());
        info!(
            "batch complete: {} accepted, {} rejected, {} no face, {} failed",
            report.accepted, report.rejected, report.no_faces_detected, report.processing_failed
        );
        Ok(report)
    }
}

fn worker_loop(
    worker_id: usize,
    queue: &Mutex<VecDeque<ChunkSpec>>,
    aggregator: &ResultAggregator,
    ctx: &ChunkContext<'_>,
    cancel: &CancelHandle,
) {
    loop {
        if cancel.is_cancelled() {
            debug!("worker {} stopping: batch cancelled", worker_id);
            break;
        }
        let Some(chunk) = queue.lock().pop_front() else {
            break;
        };
        debug!("worker {} picked up {}", worker_id, chunk.name());
        let outcome = process_chunk(ctx, &chunk);
        aggregator.record(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tempfile::tempdir;

    use crate::extract::{ChunkArtifacts, ExtractError, ExtractResult};
    use crate::models::{SyncAssessment, ThresholdPreset, VerdictReason};
    use crate::oracle::{OracleOutputs, OracleResult, OracleReview};
    use crate::organize::{ACCEPTED_DIR, REJECTED_DIR};

    struct FakeExtractor {
        fail_on: Option<usize>,
    }

    impl ArtifactExtractor for FakeExtractor {
        fn extract(
            &self,
            _source: &SourceMedia,
            chunk: &ChunkSpec,
            scratch_dir: &Path,
        ) -> ExtractResult<ChunkArtifacts> {
            if self.fail_on == Some(chunk.index) {
                return Err(ExtractError::CommandFailed {
                    tool: "ffmpeg".into(),
                    exit_code: 1,
                    message: "simulated failure".into(),
                });
            }
            let clip = scratch_dir.join(format!("{}.mp4", chunk.name()));
            let audio = scratch_dir.join(format!("{}.wav", chunk.name()));
            fs::write(&clip, b"clip").unwrap();
            fs::write(&audio, b"audio").unwrap();
            Ok(ChunkArtifacts { clip, audio })
        }
    }

    struct SlowExtractor {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl SlowExtractor {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let peak = Arc::new(AtomicUsize::new(0));
            let extractor = Self {
                active: Arc::new(AtomicUsize::new(0)),
                peak: peak.clone(),
            };
            (extractor, peak)
        }
    }

    impl ArtifactExtractor for SlowExtractor {
        fn extract(
            &self,
            _source: &SourceMedia,
            chunk: &ChunkSpec,
            scratch_dir: &Path,
        ) -> ExtractResult<ChunkArtifacts> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);

            let clip = scratch_dir.join(format!("{}.mp4", chunk.name()));
            let audio = scratch_dir.join(format!("{}.wav", chunk.name()));
            fs::write(&clip, b"clip").unwrap();
            fs::write(&audio, b"audio").unwrap();
            Ok(ChunkArtifacts { clip, audio })
        }
    }

    struct FakeOracle {
        assessments: HashMap<String, SyncAssessment>,
        default: SyncAssessment,
        cancel_on: Option<(String, CancelHandle)>,
    }

    impl FakeOracle {
        fn scoring(default: SyncAssessment) -> Self {
            Self {
                assessments: HashMap::new(),
                default,
                cancel_on: None,
            }
        }

        fn with_assessment(mut self, name: &str, assessment: SyncAssessment) -> Self {
            self.assessments.insert(name.to_string(), assessment);
            self
        }

        fn cancelling_on(mut self, name: &str, handle: CancelHandle) -> Self {
            self.cancel_on = Some((name.to_string(), handle));
            self
        }
    }

    impl SyncOracle for FakeOracle {
        fn assess(
            &self,
            chunk_name: &str,
            _clip: &Path,
            _audio: &Path,
            _work_dir: &Path,
        ) -> OracleResult<OracleReview> {
            if let Some((name, handle)) = &self.cancel_on {
                if name == chunk_name {
                    handle.cancel();
                }
            }
            let assessment = self
                .assessments
                .get(chunk_name)
                .cloned()
                .unwrap_or_else(|| self.default.clone());
            Ok(OracleReview {
                assessment,
                tracks: Vec::new(),
                outputs: OracleOutputs::default(),
            })
        }
    }

    fn chunks(count: usize) -> Vec<ChunkSpec> {
        (0..count)
            .map(|index| ChunkSpec {
                index,
                start_secs: index as f64 * 25.0,
                duration_secs: 30.0,
                overlap_secs: 5.0,
            })
            .collect()
    }

    fn good() -> SyncAssessment {
        SyncAssessment::Scored {
            offset_frames: 0,
            confidence: 9.0,
        }
    }

    #[test]
    fn processes_every_chunk_and_sorts_the_report() {
        let dir = tempdir().unwrap();
        let oracle = FakeOracle::scoring(good())
            .with_assessment(
                "chunk_001",
                SyncAssessment::Scored {
                    offset_frames: 0,
                    confidence: 1.0,
                },
            )
            .with_assessment("chunk_003", SyncAssessment::NoFaceDetected);

        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(oracle),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        )
        .with_max_workers(2);

        let source = SourceMedia::new("/media/talk.mp4", 130.0);
        let report = scheduler.run(&source, chunks(5)).unwrap();

        assert_eq!(report.total_chunks, 5);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.no_faces_detected, 1);
        let indices: Vec<_> = report.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn one_failing_chunk_does_not_stop_the_batch() {
        let dir = tempdir().unwrap();
        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: Some(1) }),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        );

        let source = SourceMedia::new("/media/talk.mp4", 80.0);
        let report = scheduler.run(&source, chunks(3)).unwrap();

        assert_eq!(report.total_chunks, 3);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.processing_failed, 1);
        let failed = &report.chunks[1];
        assert_eq!(failed.reason, VerdictReason::AnalysisFailed);
        assert!(failed.error.as_deref().unwrap().contains("extraction failed"));
    }

    #[test]
    fn worker_pool_never_exceeds_the_plan() {
        let dir = tempdir().unwrap();
        let (extractor, peak) = SlowExtractor::new();
        let scheduler = BatchScheduler::new(
            Box::new(extractor),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        )
        .with_max_workers(8);

        let source = SourceMedia::new("/media/talk.mp4", 80.0);
        let report = scheduler.run(&source, chunks(3)).unwrap();
        assert_eq!(report.total_chunks, 3);

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded plan size", peak);
    }

    #[test]
    fn cancelled_before_run_processes_nothing() {
        let dir = tempdir().unwrap();
        let handle = CancelHandle::new();
        handle.cancel();

        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        )
        .with_cancel_handle(handle);

        let source = SourceMedia::new("/media/talk.mp4", 80.0);
        let err = scheduler.run(&source, chunks(3)).unwrap_err();
        match err {
            BatchError::Cancelled { completed, planned } => {
                assert_eq!(completed, 0);
                assert_eq!(planned, 3);
            }
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn cancel_mid_run_stops_scheduling_new_chunks() {
        let dir = tempdir().unwrap();
        let handle = CancelHandle::new();
        let oracle =
            FakeOracle::scoring(good()).cancelling_on("chunk_001", handle.clone());

        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(oracle),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        )
        .with_max_workers(1)
        .with_cancel_handle(handle);

        let source = SourceMedia::new("/media/talk.mp4", 120.0);
        let err = scheduler.run(&source, chunks(4)).unwrap_err();
        match err {
            BatchError::Cancelled { completed, planned } => {
                // chunk_000 finished, chunk_001 was in flight when it
                // cancelled and still ran to completion.
                assert_eq!(completed, 2);
                assert_eq!(planned, 4);
            }
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn zero_workers_is_rejected() {
        let dir = tempdir().unwrap();
        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        )
        .with_max_workers(0);

        let source = SourceMedia::new("/media/talk.mp4", 80.0);
        let err = scheduler.run(&source, chunks(2)).unwrap_err();
        assert!(matches!(err, BatchError::InvalidWorkerCount));
    }

    #[test]
    fn organizer_mode_places_chunks_into_partitions() {
        let dir = tempdir().unwrap();
        let output_root = dir.path().join("filtered");
        let oracle = FakeOracle::scoring(good()).with_assessment(
            "chunk_001",
            SyncAssessment::Scored {
                offset_frames: 40,
                confidence: 9.0,
            },
        );

        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(oracle),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        )
        .with_organizer(OutputOrganizer::new(&output_root));

        let source = SourceMedia::new("/media/talk.mp4", 80.0);
        let report = scheduler.run(&source, chunks(2)).unwrap();

        assert!(output_root.join(ACCEPTED_DIR).join("chunk_000").is_dir());
        assert!(output_root.join(REJECTED_DIR).join("chunk_001").is_dir());
        assert!(!report.chunks[0].artifact_paths.is_empty());
        assert_eq!(report.chunks[1].reason, VerdictReason::HighOffset);
    }

    #[test]
    fn empty_plan_yields_an_empty_report() {
        let dir = tempdir().unwrap();
        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            dir.path().join("scratch"),
        );

        let source = SourceMedia::new("/media/talk.mp4", 1.0);
        let report = scheduler.run(&source, Vec::new()).unwrap();
        assert_eq!(report.total_chunks, 0);
        assert!(report.chunks.is_empty());
    }

    #[test]
    fn scratch_dirs_are_removed_unless_kept() {
        let dir = tempdir().unwrap();
        let scratch_root = dir.path().join("scratch");

        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            &scratch_root,
        );
        let source = SourceMedia::new("/media/talk.mp4", 55.0);
        scheduler.run(&source, chunks(2)).unwrap();
        assert!(!scratch_root.join("chunk_000").exists());

        let kept_root = dir.path().join("scratch_kept");
        let scheduler = BatchScheduler::new(
            Box::new(FakeExtractor { fail_on: None }),
            Box::new(FakeOracle::scoring(good())),
            ThresholdPreset::Medium.threshold(),
            &kept_root,
        )
        .with_keep_scratch(true);
        scheduler.run(&source, chunks(2)).unwrap();
        assert!(kept_root.join("chunk_000").join("chunk_000.mp4").exists());
    }
}
