//! FFmpeg-backed artifact extraction.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::models::{ChunkSpec, SourceMedia};
use crate::process::run_with_timeout;

use super::{
    ArtifactExtractor, ChunkArtifacts, ExtractError, ExtractResult, ORACLE_CHANNELS,
    ORACLE_SAMPLE_RATE,
};

/// Default deadline for one FFmpeg invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Cuts chunk clips with stream copy and extracts scorer-ready audio.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg_bin: String,
    timeout: Duration,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegExtractor {
    /// Create an extractor using the given ffmpeg binary.
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Deadline for each FFmpeg invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cut the chunk's window out of the source without re-encoding.
    ///
    /// Input-side seek; with stream copy the cut snaps to the nearest
    /// keyframe, matching the reference pipeline.
    fn cut_clip(&self, source: &Path, chunk: &ChunkSpec, out: &Path) -> ExtractResult<()> {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-ss")
            .arg(format!("{:.3}", chunk.start_secs))
            .arg("-t")
            .arg(format!("{:.3}", chunk.duration_secs))
            .arg("-i")
            .arg(source)
            .arg("-c")
            .arg("copy")
            .arg(out);

        self.run(cmd, out)
    }

    /// Extract audio from the cut clip, so clip and audio describe the
    /// identical window regardless of keyframe snapping.
    fn extract_audio(&self, clip: &Path, out: &Path) -> ExtractResult<()> {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(clip)
            .arg("-vn")
            .arg("-ac")
            .arg(ORACLE_CHANNELS.to_string())
            .arg("-ar")
            .arg(ORACLE_SAMPLE_RATE.to_string())
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg(out);

        self.run(cmd, out)
    }

    fn run(&self, cmd: Command, expected: &Path) -> ExtractResult<()> {
        let output = run_with_timeout(cmd, self.timeout)?;

        if !output.success() {
            return Err(ExtractError::CommandFailed {
                tool: "ffmpeg".to_string(),
                exit_code: output.exit_code(),
                message: output.stderr.trim().to_string(),
            });
        }
        if !expected.exists() {
            return Err(ExtractError::OutputMissing(expected.to_path_buf()));
        }

        Ok(())
    }
}

impl ArtifactExtractor for FfmpegExtractor {
    fn extract(
        &self,
        source: &SourceMedia,
        chunk: &ChunkSpec,
        scratch_dir: &Path,
    ) -> ExtractResult<ChunkArtifacts> {
        if !source.path.exists() {
            return Err(ExtractError::SourceNotFound(source.path.clone()));
        }

        let name = chunk.name();
        let clip = scratch_dir.join(format!("{}.mp4", name));
        let audio = scratch_dir.join(format!("{}.wav", name));

        tracing::debug!(
            "Extracting {} [{:.3}s..{:.3}s) from {}",
            name,
            chunk.start_secs,
            chunk.end_secs(),
            source.path.display()
        );

        self.cut_clip(&source.path, chunk, &clip)?;
        self.extract_audio(&clip, &audio)?;

        Ok(ChunkArtifacts { clip, audio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_reported() {
        let extractor = FfmpegExtractor::new("ffmpeg");
        let source = SourceMedia::new("/nonexistent/recording.mp4", 60.0);
        let chunk = ChunkSpec {
            index: 0,
            start_secs: 0.0,
            duration_secs: 30.0,
            overlap_secs: 5.0,
        };

        let result = extractor.extract(&source, &chunk, Path::new("/tmp"));
        assert!(matches!(result, Err(ExtractError::SourceNotFound(_))));
    }
}
