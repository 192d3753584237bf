//! Process adapter for a SyncNet-style scoring pipeline.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::models::{SyncAssessment, TrackScore};
use crate::process::run_with_timeout;

use super::{OracleError, OracleOutputs, OracleResult, OracleReview, SyncOracle};

/// Default deadline for one scoring run.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// How much scorer stderr to keep in error messages.
const STDERR_TAIL_CHARS: usize = 800;

/// Runs the external scorer and reads back its offsets record.
///
/// Expected scorer behavior, matching the reference SyncNet pipeline:
/// on success it writes `pywork/<reference>/offsets.txt` under the data
/// dir, one line per detected face track:
///
/// ```text
/// TRACK 0: OFFSET -1, CONF 7.183
/// ```
///
/// The assessment takes the track with the highest confidence. A clean
/// exit with no offsets record means the detector found no usable face
/// track in the chunk.
pub struct SyncNetOracle {
    command: String,
    extra_args: Vec<String>,
    timeout: Duration,
    min_face_size: u32,
    min_track: u32,
    preserve_outputs: bool,
}

impl SyncNetOracle {
    /// Create an adapter invoking the given scorer command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            extra_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            min_face_size: 50,
            min_track: 50,
            preserve_outputs: true,
        }
    }

    /// Extra arguments placed before the per-chunk ones.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Deadline for one scoring run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum face size in pixels passed to the detector.
    pub fn with_min_face_size(mut self, min_face_size: u32) -> Self {
        self.min_face_size = min_face_size;
        self
    }

    /// Minimum face-track length in frames passed to the detector.
    pub fn with_min_track(mut self, min_track: u32) -> Self {
        self.min_track = min_track;
        self
    }

    /// Whether to pick up the scorer's crop/visualization outputs.
    pub fn with_preserve_outputs(mut self, preserve: bool) -> Self {
        self.preserve_outputs = preserve;
        self
    }

    /// Gather the scorer's side outputs for this chunk, if any.
    fn collect_outputs(
        &self,
        chunk_name: &str,
        work_dir: &Path,
        offsets_record: Option<PathBuf>,
    ) -> OracleOutputs {
        if !self.preserve_outputs {
            return OracleOutputs::default();
        }

        let mut outputs = OracleOutputs {
            offsets_record,
            ..Default::default()
        };

        let crop_dir = work_dir.join("pycrop").join(chunk_name);
        if let Ok(entries) = std::fs::read_dir(&crop_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "avi") {
                    outputs.cropped_tracks.push(path);
                }
            }
            outputs.cropped_tracks.sort();
        }

        let annotated = work_dir.join("pyavi").join(chunk_name).join("video_out.avi");
        if annotated.exists() {
            outputs.annotated_clip = Some(annotated);
        }

        outputs
    }
}

impl SyncOracle for SyncNetOracle {
    fn assess(
        &self,
        chunk_name: &str,
        clip: &Path,
        audio: &Path,
        work_dir: &Path,
    ) -> OracleResult<OracleReview> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.extra_args)
            .arg("--videofile")
            .arg(clip)
            .arg("--audiofile")
            .arg(audio)
            .arg("--reference")
            .arg(chunk_name)
            .arg("--data_dir")
            .arg(work_dir)
            .arg("--min_face_size")
            .arg(self.min_face_size.to_string())
            .arg("--min_track")
            .arg(self.min_track.to_string());

        let output = run_with_timeout(cmd, self.timeout)?;
        if !output.success() {
            return Err(OracleError::ScorerFailed {
                exit_code: output.exit_code(),
                message: tail_of(&output.stderr),
            });
        }

        let offsets_path = work_dir.join("pywork").join(chunk_name).join("offsets.txt");
        if !offsets_path.exists() {
            // The reference pipeline exits cleanly when the face
            // detector comes up empty; the offsets record is simply
            // never written.
            tracing::debug!("No offsets record for {}, treating as no face", chunk_name);
            return Ok(OracleReview {
                assessment: SyncAssessment::NoFaceDetected,
                tracks: Vec::new(),
                outputs: self.collect_outputs(chunk_name, work_dir, None),
            });
        }

        let raw = std::fs::read_to_string(&offsets_path).map_err(|e| OracleError::Io {
            operation: format!("read {}", offsets_path.display()),
            source: e,
        })?;

        let tracks = parse_offsets(&raw);
        let Some(best) = best_track(&tracks) else {
            return Err(OracleError::MalformedOffsets {
                path: offsets_path,
                message: "no track records found".to_string(),
            });
        };

        tracing::debug!(
            "{}: offset {} frames, confidence {:.3} ({} tracks)",
            chunk_name,
            best.offset_frames,
            best.confidence,
            tracks.len()
        );

        Ok(OracleReview {
            assessment: SyncAssessment::Scored {
                offset_frames: best.offset_frames,
                confidence: best.confidence,
            },
            tracks,
            outputs: self.collect_outputs(chunk_name, work_dir, Some(offsets_path)),
        })
    }
}

/// Parse offsets lines of the form `TRACK 0: OFFSET -1, CONF 7.183`.
///
/// Lines that do not match are skipped, like the reference parser.
fn parse_offsets(raw: &str) -> Vec<TrackScore> {
    raw.lines().filter_map(parse_offsets_line).collect()
}

fn parse_offsets_line(line: &str) -> Option<TrackScore> {
    let rest = line.trim().strip_prefix("TRACK ")?;
    let (track, rest) = rest.split_once(':')?;
    let rest = rest.trim().strip_prefix("OFFSET ")?;
    let (offset, rest) = rest.split_once(',')?;
    let conf = rest.trim().strip_prefix("CONF ")?;

    Some(TrackScore {
        track: track.trim().parse().ok()?,
        offset_frames: offset.trim().parse().ok()?,
        confidence: conf.trim().parse().ok()?,
    })
}

/// Best track is the one the scorer was most confident about.
fn best_track(tracks: &[TrackScore]) -> Option<TrackScore> {
    tracks
        .iter()
        .copied()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// Last part of scorer stderr, enough to diagnose without flooding logs.
fn tail_of(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let start = trimmed.len() - STDERR_TAIL_CHARS;
    // Stay on a char boundary.
    let start = (start..trimmed.len())
        .find(|i| trimmed.is_char_boundary(*i))
        .unwrap_or(start);
    format!("...{}", &trimmed[start..])
}
