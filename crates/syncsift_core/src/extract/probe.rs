//! Source probing via ffprobe.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde_json::Value;

use crate::models::SourceMedia;
use crate::process::run_with_timeout;

use super::{ExtractError, ExtractResult};

/// Probe a source recording for duration and stream basics.
///
/// Uses `ffprobe -print_format json -show_format -show_streams`. An
/// unreadable source (missing file, no parseable duration) is a fatal
/// error for the whole batch, so this runs before any chunk work.
pub fn probe_source(ffprobe_bin: &str, path: &Path, timeout: Duration) -> ExtractResult<SourceMedia> {
    if !path.exists() {
        return Err(ExtractError::SourceNotFound(path.to_path_buf()));
    }

    tracing::debug!("Probing source: {}", path.display());

    let mut cmd = Command::new(ffprobe_bin);
    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path);

    let output = run_with_timeout(cmd, timeout)?;
    if !output.success() {
        return Err(ExtractError::CommandFailed {
            tool: "ffprobe".to_string(),
            exit_code: output.exit_code(),
            message: output.stderr.trim().to_string(),
        });
    }

    let json: Value =
        serde_json::from_str(&output.stdout).map_err(|e| ExtractError::ParseError {
            tool: "ffprobe".to_string(),
            message: e.to_string(),
        })?;

    parse_probe_json(&json, path)
}

/// Parse the JSON output from ffprobe.
fn parse_probe_json(json: &Value, path: &Path) -> ExtractResult<SourceMedia> {
    let duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ExtractError::ParseError {
            tool: "ffprobe".to_string(),
            message: format!("no container duration for {}", path.display()),
        })?;

    let mut frame_rate = None;
    let mut audio_sample_rate = None;

    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        for stream in streams {
            match stream.get("codec_type").and_then(|t| t.as_str()) {
                Some("video") if frame_rate.is_none() => {
                    frame_rate = stream
                        .get("r_frame_rate")
                        .and_then(|r| r.as_str())
                        .and_then(parse_frame_rate);
                }
                Some("audio") if audio_sample_rate.is_none() => {
                    audio_sample_rate = stream
                        .get("sample_rate")
                        .and_then(|r| r.as_str())
                        .and_then(|s| s.parse().ok());
                }
                _ => {}
            }
        }
    }

    Ok(SourceMedia {
        path: path.to_path_buf(),
        duration_secs,
        frame_rate,
        audio_sample_rate,
    })
}

/// Parse a frame rate string like "24000/1001" into a float.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let parts: Vec<&str> = rate.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
    }
    rate.parse().ok()
}
