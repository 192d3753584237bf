//! Sync assessments, thresholds, and quality verdicts.

use serde::{Deserialize, Serialize};

/// One raw per-track record from the scorer's offsets output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackScore {
    /// Face track number assigned by the scorer.
    pub track: usize,

    /// AV offset estimate in video frames for this track.
    pub offset_frames: i64,

    /// Scorer confidence for this track.
    pub confidence: f64,
}

/// Outcome of scoring one chunk with the sync oracle.
///
/// Offset and confidence only exist when the scorer actually produced
/// an estimate, so they live on the `Scored` variant and cannot be read
/// from the other states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncAssessment {
    /// The scorer produced an offset estimate.
    Scored {
        /// AV offset in frames for the best face track.
        offset_frames: i64,
        /// Scorer confidence for the best face track.
        confidence: f64,
    },
    /// The scorer ran cleanly but found no usable face track.
    NoFaceDetected,
    /// Scoring infrastructure failed (crash, timeout, bad output).
    ///
    /// The failure detail travels in the chunk outcome's error field.
    ProcessingFailed,
}

impl SyncAssessment {
    /// Offset and confidence of the best track, when scored.
    pub fn score(&self) -> Option<(i64, f64)> {
        match self {
            SyncAssessment::Scored {
                offset_frames,
                confidence,
            } => Some((*offset_frames, *confidence)),
            _ => None,
        }
    }
}

/// Acceptance gates a scored chunk must clear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThreshold {
    /// Minimum scorer confidence. A confidence equal to this passes.
    pub min_confidence: f64,

    /// Maximum absolute AV offset in frames. An offset magnitude equal
    /// to this passes.
    pub max_abs_offset: i64,
}

/// Named threshold presets, ordered from most to least selective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPreset {
    /// Best material only.
    Strict,
    /// High quality with a little more tolerance.
    High,
    /// Good quality; the usual choice for training sets.
    #[default]
    Medium,
    /// Keeps more data at the cost of some quality.
    Relaxed,
    /// Accepts everything the scorer managed to score.
    None,
}

impl ThresholdPreset {
    /// The gates this preset stands for.
    pub fn threshold(self) -> QualityThreshold {
        match self {
            ThresholdPreset::Strict => QualityThreshold {
                min_confidence: 8.0,
                max_abs_offset: 2,
            },
            ThresholdPreset::High => QualityThreshold {
                min_confidence: 6.0,
                max_abs_offset: 3,
            },
            ThresholdPreset::Medium => QualityThreshold {
                min_confidence: 4.0,
                max_abs_offset: 5,
            },
            ThresholdPreset::Relaxed => QualityThreshold {
                min_confidence: 2.0,
                max_abs_offset: 8,
            },
            ThresholdPreset::None => QualityThreshold {
                min_confidence: 0.0,
                max_abs_offset: 50,
            },
        }
    }

    /// Short human-readable description for help text.
    pub fn description(&self) -> &'static str {
        match self {
            ThresholdPreset::Strict => "Only the best-synced chunks, rejects aggressively",
            ThresholdPreset::High => "High quality, small offsets allowed",
            ThresholdPreset::Medium => "Good quality, recommended for most training sets",
            ThresholdPreset::Relaxed => "Keeps more data, tolerates larger offsets",
            ThresholdPreset::None => "No quality gate; only face detection failures reject",
        }
    }

    /// All presets, most selective first.
    pub fn all() -> [ThresholdPreset; 5] {
        [
            ThresholdPreset::Strict,
            ThresholdPreset::High,
            ThresholdPreset::Medium,
            ThresholdPreset::Relaxed,
            ThresholdPreset::None,
        ]
    }
}

impl std::str::FromStr for ThresholdPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ThresholdPreset::Strict),
            "high" => Ok(ThresholdPreset::High),
            "medium" => Ok(ThresholdPreset::Medium),
            "relaxed" => Ok(ThresholdPreset::Relaxed),
            "none" => Ok(ThresholdPreset::None),
            other => Err(format!(
                "unknown preset '{}' (expected strict, high, medium, relaxed, or none)",
                other
            )),
        }
    }
}

impl std::fmt::Display for ThresholdPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdPreset::Strict => write!(f, "strict"),
            ThresholdPreset::High => write!(f, "high"),
            ThresholdPreset::Medium => write!(f, "medium"),
            ThresholdPreset::Relaxed => write!(f, "relaxed"),
            ThresholdPreset::None => write!(f, "none"),
        }
    }
}

/// Why a chunk was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// Passed every gate.
    Accepted,
    /// Scorer confidence below the minimum.
    LowConfidence,
    /// Absolute offset above the maximum.
    HighOffset,
    /// No usable face track in the chunk.
    NoFace,
    /// Processing never completed for the chunk.
    AnalysisFailed,
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictReason::Accepted => write!(f, "accepted"),
            VerdictReason::LowConfidence => write!(f, "low_confidence"),
            VerdictReason::HighOffset => write!(f, "high_offset"),
            VerdictReason::NoFace => write!(f, "no_face"),
            VerdictReason::AnalysisFailed => write!(f, "analysis_failed"),
        }
    }
}

/// Quality decision for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Whether the chunk goes to the accepted partition.
    pub accepted: bool,

    /// The first gate that failed, or `Accepted`.
    pub reason: VerdictReason,
}

impl QualityVerdict {
    /// Verdict for a chunk that cleared every gate.
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: VerdictReason::Accepted,
        }
    }

    /// Verdict for a rejected chunk with the given reason.
    pub fn reject(reason: VerdictReason) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_table_values() {
        let medium = ThresholdPreset::Medium.threshold();
        assert_eq!(medium.min_confidence, 4.0);
        assert_eq!(medium.max_abs_offset, 5);

        let strict = ThresholdPreset::Strict.threshold();
        assert_eq!(strict.min_confidence, 8.0);
        assert_eq!(strict.max_abs_offset, 2);

        let none = ThresholdPreset::None.threshold();
        assert_eq!(none.min_confidence, 0.0);
        assert_eq!(none.max_abs_offset, 50);
    }

    #[test]
    fn presets_get_stricter_in_order() {
        let all = ThresholdPreset::all();
        for pair in all.windows(2) {
            let (stricter, looser) = (pair[0].threshold(), pair[1].threshold());
            assert!(stricter.min_confidence >= looser.min_confidence);
            assert!(stricter.max_abs_offset <= looser.max_abs_offset);
        }
    }

    #[test]
    fn preset_parses_case_insensitively() {
        assert_eq!("medium".parse(), Ok(ThresholdPreset::Medium));
        assert_eq!("STRICT".parse(), Ok(ThresholdPreset::Strict));
        assert_eq!("None".parse(), Ok(ThresholdPreset::None));
        assert!("bogus".parse::<ThresholdPreset>().is_err());
    }

    #[test]
    fn score_only_readable_when_scored() {
        let scored = SyncAssessment::Scored {
            offset_frames: -1,
            confidence: 4.511,
        };
        assert_eq!(scored.score(), Some((-1, 4.511)));
        assert_eq!(SyncAssessment::NoFaceDetected.score(), None);
        assert_eq!(SyncAssessment::ProcessingFailed.score(), None);
    }

    #[test]
    fn assessment_serializes_with_status_tag() {
        let scored = SyncAssessment::Scored {
            offset_frames: 2,
            confidence: 5.5,
        };
        let json = serde_json::to_string(&scored).unwrap();
        assert!(json.contains("\"status\":\"scored\""));

        let no_face = serde_json::to_string(&SyncAssessment::NoFaceDetected).unwrap();
        assert!(no_face.contains("no_face_detected"));
    }
}
