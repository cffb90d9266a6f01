//! Match scoring: how well a candidate observation continues a track.
//!
//! The score is the weighted geometric mean of three factors, each in `[0, 1]`:
//!
//! ```text
//! geometric   g = exp(-d / distance_scale_m)            (0 beyond max_distance_m)
//! appearance  a = 1 - appearance_distance
//! temporal    t = exp(-(gap - 1) / gap_decay_frames)    (0 for gap <= 0 or gap > max_frame_gap)
//!
//! score = g^wg * a^wa * t^wt
//! ```
//!
//! `d` is measured between object centroids after mapping each into the world
//! frame with the camera pose of its own observation, so displacement that is
//! explained by camera motion alone costs nothing. Each factor is
//! non-increasing in its input and the product is monotone in each factor,
//! so the score is non-increasing in distance, dissimilarity and frame gap.

use anyhow::{Result, ensure};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::instance::Evidence;

use super::frame::TrackFrame;

/// Displacement (m) at which the geometric factor falls to 1/e.
const DISTANCE_SCALE_M: f64 = 0.5;
/// Displacement (m) beyond which no match is plausible.
const MAX_DISTANCE_M: f64 = 3.0;
/// Extra missed frames at which the temporal factor falls to 1/e.
const GAP_DECAY_FRAMES: f64 = 10.0;
/// Frame gap beyond which no match is plausible.
const MAX_FRAME_GAP: i64 = 30;

/// Tuning for [`Track::score_match`](super::Track::score_match).
///
/// Weights are exponents; a weight of 0 disables its factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub distance_scale_m: f64,
    pub max_distance_m: f64,
    pub gap_decay_frames: f64,
    pub max_frame_gap: i64,
    pub geometric_weight: f64,
    pub appearance_weight: f64,
    pub temporal_weight: f64,
}

impl MatchConfig {
    pub fn new() -> Self {
        Self {
            distance_scale_m: DISTANCE_SCALE_M,
            max_distance_m: MAX_DISTANCE_M,
            gap_decay_frames: GAP_DECAY_FRAMES,
            max_frame_gap: MAX_FRAME_GAP,
            geometric_weight: 1.0,
            appearance_weight: 1.0,
            temporal_weight: 1.0,
        }
    }

    /// Reject configurations that cannot produce a score in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.distance_scale_m > 0.0,
            "distance_scale_m must be positive, got {}",
            self.distance_scale_m
        );
        ensure!(
            self.gap_decay_frames > 0.0,
            "gap_decay_frames must be positive, got {}",
            self.gap_decay_frames
        );
        ensure!(
            self.max_distance_m >= 0.0,
            "max_distance_m must be non-negative, got {}",
            self.max_distance_m
        );
        ensure!(
            self.max_frame_gap >= 0,
            "max_frame_gap must be non-negative, got {}",
            self.max_frame_gap
        );
        for (name, weight) in [
            ("geometric_weight", self.geometric_weight),
            ("appearance_weight", self.appearance_weight),
            ("temporal_weight", self.temporal_weight),
        ] {
            ensure!(weight >= 0.0 && weight.is_finite(), "{} must be finite and non-negative, got {}", name, weight);
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Individual factors of a match score, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub geometric: f64,
    pub appearance: f64,
    pub temporal: f64,
    pub total: f64,
}

/// Object centroid in world frame.
fn centroid_world<E: Evidence>(frame: &TrackFrame<E>) -> Vector3<f64> {
    frame
        .camera_pose()
        .transform_point(&frame.evidence().centroid_cam())
}

/// Exponential fall-off of `value` over `scale`; a non-positive scale only
/// accepts an exact zero.
fn decay(value: f64, scale: f64) -> f64 {
    if scale > 0.0 {
        (-value / scale).exp()
    } else if value == 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn geometric_factor(distance_m: f64, config: &MatchConfig) -> f64 {
    if !distance_m.is_finite() || distance_m > config.max_distance_m {
        return 0.0;
    }
    decay(distance_m.max(0.0), config.distance_scale_m)
}

pub fn appearance_factor(appearance_distance: f64) -> f64 {
    if appearance_distance.is_nan() {
        return 0.0;
    }
    1.0 - appearance_distance.clamp(0.0, 1.0)
}

pub fn temporal_factor(frame_gap: i64, config: &MatchConfig) -> f64 {
    if frame_gap <= 0 || frame_gap > config.max_frame_gap {
        return 0.0;
    }
    decay((frame_gap - 1) as f64, config.gap_decay_frames)
}

/// Combine the three factors into a single score in `[0, 1]`.
pub fn combine(geometric: f64, appearance: f64, temporal: f64, config: &MatchConfig) -> f64 {
    let score = geometric.powf(config.geometric_weight)
        * appearance.powf(config.appearance_weight)
        * temporal.powf(config.temporal_weight);
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

/// Score `candidate` as the observation following `last`.
pub fn score_candidate<E: Evidence>(
    last: &TrackFrame<E>,
    candidate: &TrackFrame<E>,
    config: &MatchConfig,
) -> MatchScore {
    let distance = (centroid_world(candidate) - centroid_world(last)).norm();
    let geometric = geometric_factor(distance, config);
    let appearance = appearance_factor(last.evidence().appearance_distance(candidate.evidence()));
    let temporal = temporal_factor(candidate.frame_idx().saturating_sub(last.frame_idx()), config);

    MatchScore {
        geometric,
        appearance,
        temporal,
        total: combine(geometric, appearance, temporal, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_factors_at_perfect_match() {
        let cfg = MatchConfig::default();
        assert_eq!(geometric_factor(0.0, &cfg), 1.0);
        assert_eq!(appearance_factor(0.0), 1.0);
        assert_eq!(temporal_factor(1, &cfg), 1.0);
        assert_eq!(combine(1.0, 1.0, 1.0, &cfg), 1.0);
    }

    #[test]
    fn test_factors_outside_gates() {
        let cfg = MatchConfig::default();
        assert_eq!(geometric_factor(cfg.max_distance_m + 0.1, &cfg), 0.0);
        assert_eq!(geometric_factor(f64::NAN, &cfg), 0.0);
        assert_eq!(appearance_factor(1.0), 0.0);
        assert_eq!(temporal_factor(0, &cfg), 0.0);
        assert_eq!(temporal_factor(-3, &cfg), 0.0);
        assert_eq!(temporal_factor(cfg.max_frame_gap + 1, &cfg), 0.0);
    }

    #[test]
    fn test_zero_weight_disables_factor() {
        let cfg = MatchConfig {
            temporal_weight: 0.0,
            ..MatchConfig::default()
        };
        assert_relative_eq!(combine(0.5, 1.0, 0.0, &cfg), 0.5);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_degenerate_config_is_rejected() {
        let zero_scales = MatchConfig {
            distance_scale_m: 0.0,
            gap_decay_frames: 0.0,
            ..MatchConfig::default()
        };
        let err = zero_scales.validate().unwrap_err();
        assert!(err.to_string().contains("distance_scale_m"));

        let negative_weight = MatchConfig {
            appearance_weight: -1.0,
            ..MatchConfig::default()
        };
        assert!(negative_weight.validate().is_err());
    }

    #[test]
    fn test_zero_scales_still_score_in_unit_range() {
        let cfg = MatchConfig {
            distance_scale_m: 0.0,
            gap_decay_frames: 0.0,
            ..MatchConfig::default()
        };
        assert_eq!(geometric_factor(0.0, &cfg), 1.0);
        assert_eq!(geometric_factor(0.2, &cfg), 0.0);
        assert_eq!(temporal_factor(1, &cfg), 1.0);
        assert_eq!(temporal_factor(2, &cfg), 0.0);
        assert_eq!(combine(1.0, 1.0, 1.0, &cfg), 1.0);
        assert_eq!(combine(f64::NAN, 1.0, 1.0, &cfg), 0.0);
    }

    proptest! {
        #[test]
        fn geometric_is_non_increasing(a in 0.0f64..5.0, b in 0.0f64..5.0) {
            let cfg = MatchConfig::default();
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(geometric_factor(near, &cfg) >= geometric_factor(far, &cfg));
        }

        #[test]
        fn temporal_is_non_increasing(a in 1i64..60, b in 1i64..60) {
            let cfg = MatchConfig::default();
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(temporal_factor(short, &cfg) >= temporal_factor(long, &cfg));
        }

        #[test]
        fn combined_score_stays_in_unit_range(
            g in 0.0f64..=1.0,
            a in 0.0f64..=1.0,
            t in 0.0f64..=1.0,
        ) {
            let score = combine(g, a, t, &MatchConfig::default());
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
