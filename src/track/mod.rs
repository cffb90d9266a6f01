//! Object tracks: per-object observation histories across a video sequence.
//!
//! This module contains:
//! - [`TrackFrame`] - one observation (detection + camera pose) of an object
//! - [`Track`] - an append-only, possibly sparse sequence of observations
//! - [`scoring`] - the pairwise score an associator uses to extend tracks
//! - [`eligibility`] - policies gating the allocation of a reconstruction
//! - [`InstanceTracker`] - a greedy reference associator owning many tracks
//!
//! # Example
//!
//! ```ignore
//! use rust_instance_recon::track::{Track, TrackFrame, TrackId, MatchConfig};
//!
//! let mut track: Track<InstanceView, Volume> = Track::new(TrackId::new(0));
//! track.add_frame(TrackFrame::new(11, view, pose));
//!
//! let score = track.score_match(&candidate, &MatchConfig::default());
//! let t_0i = track.frame_pose(1); // None until a second frame exists
//! ```

pub mod eligibility;
pub mod frame;
pub mod scoring;
pub mod timeline;
pub mod track;
pub mod tracker;
pub mod types;

pub use eligibility::{EligibilityPolicy, MinFrames, MultiCriteria, TrackSummary};
pub use frame::TrackFrame;
pub use scoring::{MatchConfig, MatchScore};
pub use track::Track;
pub use tracker::{FrameAssociation, InstanceTracker, TrackerConfig};
pub use types::TrackId;
