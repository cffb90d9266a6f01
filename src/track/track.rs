//! Track - one physical object followed through a frame sequence.
//!
//! A track is an append-only, time-sorted list of [`TrackFrame`]s. It may be
//! sparse: frames where the detector missed the object simply leave a gap in
//! the indices.
//!
//! Once a track carries enough evidence (see [`EligibilityPolicy`]) the
//! reconstruction engine attaches a [`ReconstructionHandle`]. The handle is
//! shared: the engine's fusion process may hold it too, and the underlying
//! volume lives as long as the longest-lived holder, not as long as the track.

use std::sync::Arc;

use anyhow::{Result, ensure};
use tracing::{debug, info, warn};

use crate::geometry::SE3;
use crate::instance::Evidence;
use crate::reconstruction::ReconstructionHandle;

use super::eligibility::{EligibilityPolicy, MinFrames, TrackSummary};
use super::frame::TrackFrame;
use super::scoring::{self, MatchConfig, MatchScore};
use super::timeline;
use super::types::TrackId;

/// A detected object's track through multiple frames.
///
/// Mutation (appending frames, attaching or detaching the reconstruction)
/// must be serialized by the owner; the track has no internal locking.
pub struct Track<E, R> {
    /// Unique identifier for this track.
    id: TrackId,

    /// Observations, strictly increasing in `frame_idx`.
    frames: Vec<TrackFrame<E>>,

    /// Shared handle to this object's 3D reconstruction, once attached.
    reconstruction: Option<ReconstructionHandle<R>>,

    /// Decides when the track is worth reconstructing.
    eligibility: Arc<dyn EligibilityPolicy>,
}

impl<E, R> Track<E, R> {
    /// Create an empty track that becomes eligible after its first frame.
    pub fn new(id: TrackId) -> Self {
        Self::with_policy(id, MinFrames::default())
    }

    /// Create an empty track with a custom eligibility policy.
    pub fn with_policy(id: TrackId, policy: impl EligibilityPolicy + 'static) -> Self {
        Self::with_shared_policy(id, Arc::new(policy))
    }

    /// Create an empty track whose eligibility policy is shared with other tracks.
    pub fn with_shared_policy(id: TrackId, eligibility: Arc<dyn EligibilityPolicy>) -> Self {
        Self {
            id,
            frames: Vec::new(),
            reconstruction: None,
            eligibility,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Append an observation.
    ///
    /// Panics if `frame` does not come strictly after the last stored frame.
    pub fn add_frame(&mut self, frame: TrackFrame<E>) {
        if let Some(last) = self.frames.last() {
            assert!(
                frame.frame_idx() > last.frame_idx(),
                "track {}: frame {} does not follow last frame {}",
                self.id,
                frame.frame_idx(),
                last.frame_idx()
            );
        }
        self.frames.push(frame);
    }

    /// Append an observation, rejecting out-of-order frames.
    ///
    /// The track is left untouched on error.
    pub fn try_add_frame(&mut self, frame: TrackFrame<E>) -> Result<()> {
        if let Some(last) = self.frames.last() {
            ensure!(
                frame.frame_idx() > last.frame_idx(),
                "track {}: frame {} does not follow last frame {}",
                self.id,
                frame.frame_idx(),
                last.frame_idx()
            );
        }
        self.frames.push(frame);
        Ok(())
    }

    fn assert_not_empty(&self, what: &str) {
        assert!(!self.frames.is_empty(), "{} queried on empty track {}", what, self.id);
    }

    /// Frame index of the first observation. Panics on an empty track.
    pub fn start_time(&self) -> i64 {
        self.assert_not_empty("start time");
        self.frames[0].frame_idx()
    }

    /// Frame index of the last observation. Panics on an empty track.
    pub fn end_time(&self) -> i64 {
        self.last_frame().frame_idx()
    }

    /// Observation at storage `position` (not frame index).
    ///
    /// Panics if `position` is out of range.
    pub fn frame(&self, position: usize) -> &TrackFrame<E> {
        assert!(
            position < self.frames.len(),
            "track {}: frame position {} out of range (len {})",
            self.id,
            position,
            self.frames.len()
        );
        &self.frames[position]
    }

    pub fn frames(&self) -> &[TrackFrame<E>] {
        &self.frames
    }

    /// Most recent observation. Panics on an empty track.
    pub fn last_frame(&self) -> &TrackFrame<E> {
        self.assert_not_empty("last frame");
        &self.frames[self.frames.len() - 1]
    }

    /// Pose of the observation at `position` relative to the first one.
    ///
    /// Computed as `T_w0^-1 * T_wi`, which anchors the object's local frame at
    /// its first observation. Returns `None` if `position` is out of range.
    pub fn frame_pose(&self, position: usize) -> Option<SE3> {
        let frame = self.frames.get(position)?;
        let first = self.frames[0].camera_pose();
        Some(first.inverse().compose(frame.camera_pose()))
    }

    /// All poses relative to the first observation, in storage order.
    pub fn relative_poses(&self) -> Vec<SE3> {
        let Some(first) = self.frames.first() else {
            return Vec::new();
        };
        let t_0w = first.camera_pose().inverse();
        self.frames
            .iter()
            .map(|f| t_0w.compose(f.camera_pose()))
            .collect()
    }

    /// Length, time bounds and viewpoint spread of this track.
    pub fn summary(&self) -> TrackSummary {
        let (translation_spread_m, rotation_spread_rad) = self
            .relative_poses()
            .iter()
            .fold((0.0f64, 0.0f64), |(t, r), pose| {
                (t.max(pose.translation.norm()), r.max(pose.rotation_angle()))
            });

        TrackSummary {
            len: self.frames.len(),
            start_time: self.frames.first().map(|f| f.frame_idx()),
            end_time: self.frames.last().map(|f| f.frame_idx()),
            translation_spread_m,
            rotation_spread_rad,
        }
    }

    /// Whether this track carries enough evidence for a 3D reconstruction.
    pub fn is_eligible_for_reconstruction(&self) -> bool {
        self.eligibility.is_eligible(&self.summary())
    }

    pub fn has_reconstruction(&self) -> bool {
        self.reconstruction.is_some()
    }

    pub fn reconstruction(&self) -> Option<&ReconstructionHandle<R>> {
        self.reconstruction.as_ref()
    }

    /// Attach a reconstruction, returning the one it replaces.
    ///
    /// The replaced handle stays alive for as long as anyone else holds it.
    pub fn set_reconstruction(
        &mut self,
        handle: ReconstructionHandle<R>,
    ) -> Option<ReconstructionHandle<R>> {
        let previous = self.reconstruction.replace(handle);
        match &previous {
            Some(old) => info!(
                "Track {}: replacing attached reconstruction ({} other holders)",
                self.id,
                Arc::strong_count(old) - 1
            ),
            None => debug!("Track {}: reconstruction attached", self.id),
        }
        previous
    }

    /// Detach the reconstruction, if any.
    pub fn take_reconstruction(&mut self) -> Option<ReconstructionHandle<R>> {
        let handle = self.reconstruction.take();
        if handle.is_some() {
            debug!("Track {}: reconstruction detached", self.id);
        }
        handle
    }

    /// Timeline of this track on the absolute frame axis, starting at frame 0.
    ///
    /// An object seen in frames 11, 12, 13 and 16 renders as eleven blank
    /// columns followed by ` 11 12 13       16`. Negative indices move the
    /// origin back to the first observation.
    pub fn ascii_art(&self) -> String {
        let origin = self.frames.first().map_or(0, |f| f.frame_idx().min(0));
        self.ascii_art_from(origin, self.timeline_width())
    }

    /// Timeline from the first to the last observation only:
    /// `[ 11 12 13       16]` for the track above.
    pub fn ascii_art_compact(&self) -> String {
        let origin = self.frames.first().map_or(0, |f| f.frame_idx());
        self.ascii_art_from(origin, self.timeline_width())
    }

    /// Timeline starting at `origin` with fixed column `width`, for aligning
    /// several tracks under each other.
    pub fn ascii_art_from(&self, origin: i64, width: usize) -> String {
        let indices: Vec<i64> = self.frames.iter().map(|f| f.frame_idx()).collect();
        timeline::render(&indices, origin, width)
    }

    /// Column width needed to render this track's indices.
    pub fn timeline_width(&self) -> usize {
        let first = self.frames.first().map_or(0, |f| f.frame_idx());
        let last = self.frames.last().map_or(0, |f| f.frame_idx());
        timeline::column_width(first).max(timeline::column_width(last))
    }
}

impl<E: Evidence, R> Track<E, R> {
    /// How well `candidate` would continue this track, in `[0, 1]`.
    ///
    /// 0 means no plausible match, 1 a perfect one. Panics on an empty track.
    pub fn score_match(&self, candidate: &TrackFrame<E>, config: &MatchConfig) -> f64 {
        self.score_match_detailed(candidate, config).total
    }

    /// [`score_match`](Self::score_match) with the default configuration.
    pub fn score_match_default(&self, candidate: &TrackFrame<E>) -> f64 {
        self.score_match(candidate, &MatchConfig::default())
    }

    /// Score broken down into its geometric, appearance and temporal factors.
    pub fn score_match_detailed(&self, candidate: &TrackFrame<E>, config: &MatchConfig) -> MatchScore {
        self.assert_not_empty("match score");
        scoring::score_candidate(self.last_frame(), candidate, config)
    }
}

impl<E, R> Drop for Track<E, R> {
    fn drop(&mut self) {
        if let Some(handle) = &self.reconstruction {
            warn!(
                "Dropping track {} with an attached reconstruction ({} other holders)",
                self.id,
                Arc::strong_count(handle) - 1
            );
        }
    }
}

impl<E, R> std::fmt::Display for Track<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Track {}: {}", self.id, self.ascii_art())
    }
}

impl<E, R> std::fmt::Debug for Track<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("frames", &self.frames.len())
            .field("start_time", &self.frames.first().map(|fr| fr.frame_idx()))
            .field("end_time", &self.frames.last().map(|fr| fr.frame_idx()))
            .field("has_reconstruction", &self.reconstruction.is_some())
            .finish()
    }
}
