//! Per-frame instance detections as consumed by object tracks.
//!
//! The detector that produces these is external. Tracks only see detections
//! through the [`Evidence`] trait, which exposes the two quantities the
//! match score needs:
//! - where the object sits relative to the camera that saw it
//! - how different two detections look
//!
//! [`InstanceView`] is the concrete payload used by the reference tracker and
//! the demo binary.

pub mod view;

pub use view::{BoundingBox, InstanceView};

use nalgebra::Vector3;

/// Detection payload carried by a [`TrackFrame`](crate::track::TrackFrame).
pub trait Evidence {
    /// Object centroid in the camera frame of the observation (meters).
    fn centroid_cam(&self) -> Vector3<f64>;

    /// Appearance dissimilarity to another detection, in `[0, 1]`.
    ///
    /// 0 means indistinguishable, 1 means certainly a different object.
    fn appearance_distance(&self, other: &Self) -> f64;
}
