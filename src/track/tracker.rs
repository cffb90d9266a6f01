//! Reference associator: owns live tracks and extends them frame by frame.
//!
//! The per-frame update follows a simple lifecycle:
//! - **Matching**: every detection is scored against every live track with
//!   [`Track::score_match`]; pairs are accepted greedily, best score first,
//!   as long as the score clears `min_match_score`.
//! - **Birth**: detections left unmatched start new tracks.
//! - **Retirement**: tracks unseen for more than `max_inactive_frames` are
//!   dropped.
//!
//! Greedy matching is not optimal for crowded scenes; a global assignment
//! solver can be plugged on top of the same pairwise scores instead.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::geometry::SE3;
use crate::instance::Evidence;
use crate::reconstruction::{ReconstructionEngine, ReconstructionHandle};

use super::eligibility::{EligibilityPolicy, MinFrames};
use super::frame::TrackFrame;
use super::scoring::MatchConfig;
use super::timeline;
use super::track::Track;
use super::types::TrackId;

/// Minimum score for a detection to extend an existing track.
const MIN_MATCH_SCORE: f64 = 0.25;
/// How many frames a track may go unseen before it is retired.
const MAX_INACTIVE_FRAMES: i64 = 10;

/// Tuning for [`InstanceTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub min_match_score: f64,
    pub max_inactive_frames: i64,
    pub matching: MatchConfig,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self {
            min_match_score: MIN_MATCH_SCORE,
            max_inactive_frames: MAX_INACTIVE_FRAMES,
            matching: MatchConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.min_match_score),
            "min_match_score must be in [0, 1], got {}",
            self.min_match_score
        );
        ensure!(
            self.max_inactive_frames >= 0,
            "max_inactive_frames must be non-negative, got {}",
            self.max_inactive_frames
        );
        self.matching.validate().context("Invalid matching config")
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of associating one frame's detections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAssociation {
    /// (detection index, track) pairs that extended existing tracks.
    pub matched: Vec<(usize, TrackId)>,
    /// (detection index, track) pairs that started new tracks.
    pub born: Vec<(usize, TrackId)>,
    /// Tracks retired after this frame.
    pub retired: Vec<TrackId>,
}

/// Greedy multi-object associator over [`Track`]s.
pub struct InstanceTracker<E, R> {
    config: TrackerConfig,
    /// Live tracks, in order of creation.
    tracks: Vec<Track<E, R>>,
    /// Policy shared by every track this tracker creates.
    eligibility: Arc<dyn EligibilityPolicy>,
    next_id: u64,
    num_retired: usize,
}

impl<E: Evidence, R> InstanceTracker<E, R> {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_policy(config, MinFrames::default())
    }

    /// Fails if `config` cannot yield scores in `[0, 1]`.
    pub fn with_policy(config: TrackerConfig, policy: impl EligibilityPolicy + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracks: Vec::new(),
            eligibility: Arc::new(policy),
            next_id: 0,
            num_retired: 0,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Live tracks, oldest first.
    pub fn tracks(&self) -> &[Track<E, R>] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track<E, R>> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track<E, R>> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    /// Number of tracks retired so far.
    pub fn num_retired(&self) -> usize {
        self.num_retired
    }

    /// Associate the detections of frame `frame_idx`, seen from `camera_pose`.
    pub fn process_frame(
        &mut self,
        frame_idx: i64,
        camera_pose: SE3,
        detections: Vec<E>,
    ) -> FrameAssociation {
        let mut candidates: Vec<Option<TrackFrame<E>>> = detections
            .into_iter()
            .map(|d| Some(TrackFrame::new(frame_idx, d, camera_pose)))
            .collect();

        // --- 1. Matching ---
        let mut pairs: Vec<(f64, usize, usize)> = Vec::new(); // (score, track_idx, det_idx)
        for (i, track) in self.tracks.iter().enumerate() {
            if track.end_time() >= frame_idx {
                continue;
            }
            for (j, cand) in candidates.iter().enumerate() {
                if let Some(cand) = cand {
                    let score = track.score_match(cand, &self.config.matching);
                    if score >= self.config.min_match_score && score > 0.0 {
                        pairs.push((score, i, j));
                    }
                }
            }
        }
        pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut result = FrameAssociation::default();
        let mut used_tracks: HashSet<usize> = HashSet::new();
        for (score, i, j) in pairs {
            if used_tracks.contains(&i) {
                continue;
            }
            let Some(cand) = candidates[j].take() else {
                continue;
            };
            let track = &mut self.tracks[i];
            debug!("Frame {}: detection {} -> track {} (score {:.3})", frame_idx, j, track.id(), score);
            track.add_frame(cand);
            used_tracks.insert(i);
            result.matched.push((j, track.id()));
        }

        // --- 2. Birth ---
        for (j, cand) in candidates.into_iter().enumerate() {
            if let Some(cand) = cand {
                let id = TrackId::new(self.next_id);
                self.next_id += 1;

                let mut track = Track::with_shared_policy(id, Arc::clone(&self.eligibility));
                track.add_frame(cand);
                debug!("Frame {}: detection {} starts track {}", frame_idx, j, id);
                self.tracks.push(track);
                result.born.push((j, id));
            }
        }

        // --- 3. Retirement ---
        let max_inactive = self.config.max_inactive_frames;
        let (live, stale): (Vec<_>, Vec<_>) = self
            .tracks
            .drain(..)
            .partition(|t| frame_idx.saturating_sub(t.end_time()) <= max_inactive);
        self.tracks = live;
        for track in stale {
            info!(
                "Retiring track {} ({} frames, last seen at {})",
                track.id(),
                track.len(),
                track.end_time()
            );
            result.retired.push(track.id());
            self.num_retired += 1;
        }

        result
    }

    /// Attach a reconstruction from `engine` to every eligible track lacking one.
    ///
    /// Returns the ids of the tracks that received a reconstruction. If the
    /// engine fails, tracks handled before the failure keep their handles and
    /// the error names them.
    pub fn attach_reconstructions<G>(&mut self, engine: &mut G) -> Result<Vec<TrackId>>
    where
        G: ReconstructionEngine<R>,
    {
        let mut attached: Vec<TrackId> = Vec::new();
        for track in self.tracks.iter_mut() {
            if track.has_reconstruction() || !track.is_eligible_for_reconstruction() {
                continue;
            }
            let handle = match engine.create_reconstruction(track.id(), &track.summary()) {
                Ok(handle) => handle,
                Err(err) => {
                    let done = attached.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                    warn!(
                        "Reconstruction failed for track {} after attaching to [{}]",
                        track.id(),
                        done
                    );
                    return Err(err.context(format!(
                        "Failed to create reconstruction for track {} (already attached: [{}])",
                        track.id(),
                        done
                    )));
                }
            };
            track.set_reconstruction(handle);
            info!("Track {} is eligible, reconstruction attached", track.id());
            attached.push(track.id());
        }
        Ok(attached)
    }

    /// Detach the reconstruction of track `id`, if both exist.
    pub fn detach_reconstruction(&mut self, id: TrackId) -> Option<ReconstructionHandle<R>> {
        self.track_mut(id)?.take_reconstruction()
    }

    /// Timelines of all live tracks, aligned on a common frame axis.
    pub fn ascii_art(&self) -> String {
        let origin = self.tracks.iter().map(|t| t.start_time()).min().unwrap_or(0);
        let last = self.tracks.iter().map(|t| t.end_time()).max().unwrap_or(0);
        let width = timeline::column_width(last);

        self.tracks
            .iter()
            .map(|t| format!("{:>6} {}", t.id().to_string(), t.ascii_art_from(origin, width)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
