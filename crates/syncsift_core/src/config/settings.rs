//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML
//! tables. Every field has a default so a partial (or missing) config
//! file always parses.

use serde::{Deserialize, Serialize};

use crate::models::{QualityThreshold, ThresholdPreset};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Chunk planning settings.
    #[serde(default)]
    pub planner: PlannerSettings,

    /// Quality filter settings.
    #[serde(default)]
    pub filter: FilterSettings,

    /// Sync scorer invocation settings.
    #[serde(default)]
    pub oracle: OracleSettings,

    /// FFmpeg extraction settings.
    #[serde(default)]
    pub extract: ExtractSettings,

    /// Worker pool settings.
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for output, scratch, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder the quality partitions and report land in.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for per-chunk scratch directories.
    #[serde(default = "default_scratch_folder")]
    pub scratch_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "filtered_output".to_string()
}

fn default_scratch_folder() -> String {
    ".scratch".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            scratch_folder: default_scratch_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Chunk planning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerSettings {
    /// Duration of each chunk in seconds.
    #[serde(default = "default_chunk_secs")]
    pub chunk_secs: f64,

    /// Overlap between consecutive chunks in seconds.
    #[serde(default = "default_overlap_secs")]
    pub overlap_secs: f64,
}

fn default_chunk_secs() -> f64 {
    30.0
}

fn default_overlap_secs() -> f64 {
    5.0
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            chunk_secs: default_chunk_secs(),
            overlap_secs: default_overlap_secs(),
        }
    }
}

/// Quality filter configuration.
///
/// The preset supplies both gates; an explicit `min_confidence` or
/// `max_abs_offset` overrides that gate individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Named preset the gates start from.
    #[serde(default)]
    pub preset: ThresholdPreset,

    /// Override for the minimum confidence gate.
    #[serde(default)]
    pub min_confidence: Option<f64>,

    /// Override for the maximum absolute offset gate.
    #[serde(default)]
    pub max_abs_offset: Option<i64>,
}

impl FilterSettings {
    /// The effective gates after applying overrides to the preset.
    pub fn resolve(&self) -> QualityThreshold {
        let mut threshold = self.preset.threshold();
        if let Some(min_confidence) = self.min_confidence {
            threshold.min_confidence = min_confidence;
        }
        if let Some(max_abs_offset) = self.max_abs_offset {
            threshold.max_abs_offset = max_abs_offset;
        }
        threshold
    }
}

/// Sync scorer invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Command that runs the scoring pipeline.
    #[serde(default = "default_oracle_command")]
    pub command: String,

    /// Extra arguments inserted before the standard ones.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Deadline for one scorer invocation in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    /// Minimum face size in pixels passed to the scorer.
    #[serde(default = "default_min_face_size")]
    pub min_face_size: u32,

    /// Minimum face track length in frames passed to the scorer.
    #[serde(default = "default_min_track")]
    pub min_track: u32,

    /// Collect cropped face tracks and the annotated clip.
    #[serde(default = "default_true")]
    pub preserve_outputs: bool,
}

fn default_oracle_command() -> String {
    "syncnet_pipeline".to_string()
}

fn default_oracle_timeout() -> u64 {
    600
}

fn default_min_face_size() -> u32 {
    50
}

fn default_min_track() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            command: default_oracle_command(),
            extra_args: Vec::new(),
            timeout_secs: default_oracle_timeout(),
            min_face_size: default_min_face_size(),
            min_track: default_min_track(),
            preserve_outputs: true,
        }
    }
}

/// FFmpeg extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractSettings {
    /// FFmpeg binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// FFprobe binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    /// Deadline for one FFmpeg invocation in seconds.
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_extract_timeout() -> u64 {
    120
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            timeout_secs: default_extract_timeout(),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Upper bound on concurrent workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Keep per-chunk scratch directories after processing.
    #[serde(default)]
    pub keep_scratch: bool,
}

fn default_max_workers() -> usize {
    2
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            keep_scratch: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to a file in the logs folder.
    #[serde(default = "default_true")]
    pub log_to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: true,
        }
    }
}
