//! Quality classification.
//!
//! Pure decision logic: an assessment plus a threshold in, a verdict
//! out. The gate order is fixed so rejection reasons are deterministic:
//! infrastructure failure, then face detection, then confidence, then
//! offset.

use crate::models::{QualityThreshold, QualityVerdict, SyncAssessment, VerdictReason};

/// Classify one chunk's assessment against the acceptance gates.
///
/// Comparisons are non-strict: a confidence equal to the minimum and an
/// offset magnitude equal to the maximum both pass.
pub fn classify(assessment: &SyncAssessment, threshold: &QualityThreshold) -> QualityVerdict {
    match assessment {
        SyncAssessment::ProcessingFailed => QualityVerdict::reject(VerdictReason::AnalysisFailed),
        SyncAssessment::NoFaceDetected => QualityVerdict::reject(VerdictReason::NoFace),
        SyncAssessment::Scored {
            offset_frames,
            confidence,
        } => {
            if *confidence < threshold.min_confidence {
                QualityVerdict::reject(VerdictReason::LowConfidence)
            } else if offset_frames.abs() > threshold.max_abs_offset {
                QualityVerdict::reject(VerdictReason::HighOffset)
            } else {
                QualityVerdict::accept()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThresholdPreset;

    fn medium() -> QualityThreshold {
        ThresholdPreset::Medium.threshold()
    }

    fn scored(offset_frames: i64, confidence: f64) -> SyncAssessment {
        SyncAssessment::Scored {
            offset_frames,
            confidence,
        }
    }

    #[test]
    fn accepts_confident_small_offset() {
        let verdict = classify(&scored(-1, 4.511), &medium());
        assert!(verdict.accepted);
        assert_eq!(verdict.reason, VerdictReason::Accepted);
    }

    #[test]
    fn rejects_low_confidence() {
        let verdict = classify(&scored(-2, 2.231), &medium());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, VerdictReason::LowConfidence);
    }

    #[test]
    fn rejects_high_offset() {
        let verdict = classify(&scored(7, 6.0), &medium());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, VerdictReason::HighOffset);
    }

    #[test]
    fn negative_offsets_count_by_magnitude() {
        let verdict = classify(&scored(-7, 6.0), &medium());
        assert_eq!(verdict.reason, VerdictReason::HighOffset);

        let verdict = classify(&scored(-5, 6.0), &medium());
        assert!(verdict.accepted);
    }

    #[test]
    fn values_equal_to_threshold_pass() {
        let verdict = classify(&scored(5, 4.0), &medium());
        assert!(verdict.accepted);
    }

    #[test]
    fn low_confidence_wins_when_both_gates_fail() {
        let verdict = classify(&scored(9, 2.0), &medium());
        assert_eq!(verdict.reason, VerdictReason::LowConfidence);
    }

    #[test]
    fn no_face_rejects_regardless_of_threshold() {
        for preset in ThresholdPreset::all() {
            let verdict = classify(&SyncAssessment::NoFaceDetected, &preset.threshold());
            assert!(!verdict.accepted);
            assert_eq!(verdict.reason, VerdictReason::NoFace);
        }
    }

    #[test]
    fn processing_failure_rejects_first() {
        let verdict = classify(&SyncAssessment::ProcessingFailed, &medium());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, VerdictReason::AnalysisFailed);
    }

    #[test]
    fn none_preset_accepts_marginal_scores() {
        let none = ThresholdPreset::None.threshold();
        let verdict = classify(&scored(12, 0.1), &none);
        assert!(verdict.accepted);
    }

    #[test]
    fn raising_min_confidence_never_turns_rejections_into_accepts() {
        let assessment = scored(-1, 4.511);
        let mut threshold = medium();

        let mut accepted_so_far = true;
        for step in 0..20 {
            threshold.min_confidence = step as f64 * 0.5;
            let verdict = classify(&assessment, &threshold);
            if !accepted_so_far {
                assert!(!verdict.accepted, "re-accepted at min_confidence {}", threshold.min_confidence);
                assert_eq!(verdict.reason, VerdictReason::LowConfidence);
            }
            accepted_so_far = verdict.accepted;
        }
    }
}
