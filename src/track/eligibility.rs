//! Reconstruction eligibility policies.
//!
//! Allocating a volumetric reconstruction is expensive, so a track has to
//! carry enough evidence first. What counts as "enough" is still open (track
//! length, viewpoint spread, detection quality, or a learned classifier), so
//! the decision is injected into each [`Track`](super::Track) as an
//! [`EligibilityPolicy`] and evaluated on a [`TrackSummary`].

use serde::{Deserialize, Serialize};

/// Statistics of a track that eligibility policies decide on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackSummary {
    /// Number of observations.
    pub len: usize,
    /// Frame index of the first observation, if any.
    pub start_time: Option<i64>,
    /// Frame index of the last observation, if any.
    pub end_time: Option<i64>,
    /// Largest camera displacement (m) relative to the first observation.
    pub translation_spread_m: f64,
    /// Largest camera rotation (rad) relative to the first observation.
    pub rotation_spread_rad: f64,
}

impl TrackSummary {
    /// Number of frames covered from first to last observation, gaps included.
    pub fn span_frames(&self) -> i64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end - start + 1,
            _ => 0,
        }
    }
}

/// Decides whether a track justifies a reconstruction.
pub trait EligibilityPolicy: Send + Sync {
    fn is_eligible(&self, summary: &TrackSummary) -> bool;
}

impl<F> EligibilityPolicy for F
where
    F: Fn(&TrackSummary) -> bool + Send + Sync,
{
    fn is_eligible(&self, summary: &TrackSummary) -> bool {
        self(summary)
    }
}

/// Eligible once the track holds at least `n` observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinFrames(pub usize);

impl Default for MinFrames {
    fn default() -> Self {
        Self(1)
    }
}

impl EligibilityPolicy for MinFrames {
    fn is_eligible(&self, summary: &TrackSummary) -> bool {
        summary.len > 0 && summary.len >= self.0
    }
}

/// Eligible when length, temporal span and viewpoint spread all pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiCriteria {
    pub min_frames: usize,
    pub min_span_frames: i64,
    pub min_translation_spread_m: f64,
}

impl Default for MultiCriteria {
    fn default() -> Self {
        Self {
            min_frames: 3,
            min_span_frames: 3,
            min_translation_spread_m: 0.0,
        }
    }
}

impl EligibilityPolicy for MultiCriteria {
    fn is_eligible(&self, summary: &TrackSummary) -> bool {
        summary.len > 0
            && summary.len >= self.min_frames
            && summary.span_frames() >= self.min_span_frames
            && summary.translation_spread_m >= self.min_translation_spread_m
    }
}
