//! TrackFrame - one observation of a tracked object.

use nalgebra::Matrix4;

use crate::geometry::SE3;

/// One frame of an object track: where and when the object was seen.
///
/// Immutable once built; tracks only ever append whole frames.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFrame<E> {
    frame_idx: i64,
    evidence: E,
    camera_pose: SE3,
}

impl<E> TrackFrame<E> {
    /// Create a new observation.
    ///
    /// # Arguments
    /// * `frame_idx` - Sequence position of the frame the object was seen in
    /// * `evidence` - Detector output for the object in that frame
    /// * `camera_pose` - Camera-to-world transform (T_wc) at that frame
    pub fn new(frame_idx: i64, evidence: E, camera_pose: SE3) -> Self {
        Self {
            frame_idx,
            evidence,
            camera_pose,
        }
    }

    /// Create an observation from a homogeneous 4x4 camera-to-world matrix.
    pub fn from_matrix(frame_idx: i64, evidence: E, camera_pose: Matrix4<f64>) -> Self {
        Self::new(frame_idx, evidence, SE3::from_matrix(camera_pose))
    }

    pub fn frame_idx(&self) -> i64 {
        self.frame_idx
    }

    pub fn evidence(&self) -> &E {
        &self.evidence
    }

    /// Camera pose (T_wc) at the time this frame was observed.
    pub fn camera_pose(&self) -> &SE3 {
        &self.camera_pose
    }

    /// Consume the frame, returning its detection payload.
    pub fn into_evidence(self) -> E {
        self.evidence
    }
}
