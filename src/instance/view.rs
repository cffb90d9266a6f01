//! InstanceView - one segmented object instance in one frame.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::Evidence;

/// Axis-aligned image-space box, `[x0, y0]` inclusive to `[x1, y1]` exclusive (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Intersection over union, 0 for disjoint or degenerate boxes.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix = (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0);
        let iy = (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0);
        let inter = ix * iy;
        if inter <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }
}

/// A detected object instance: class, mask box, 3D centroid and descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceView {
    /// Detector class label.
    pub class_id: u32,

    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,

    /// Bounding box of the instance mask.
    pub bbox: BoundingBox,

    /// Mask centroid back-projected with depth, in the camera frame.
    pub centroid_cam: Vector3<f64>,

    /// Appearance embedding. Empty when the detector provides none.
    pub descriptor: Vec<f32>,
}

impl InstanceView {
    pub fn new(class_id: u32, confidence: f64, bbox: BoundingBox, centroid_cam: Vector3<f64>) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
            centroid_cam,
            descriptor: Vec::new(),
        }
    }

    pub fn with_descriptor(mut self, descriptor: Vec<f32>) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Cosine similarity of the two descriptors, if both are present and comparable.
    fn descriptor_similarity(&self, other: &InstanceView) -> Option<f64> {
        if self.descriptor.is_empty() || self.descriptor.len() != other.descriptor.len() {
            return None;
        }

        let dot: f64 = self
            .descriptor
            .iter()
            .zip(other.descriptor.iter())
            .map(|(a, b)| f64::from(*a) * f64::from(*b))
            .sum();
        let norm_a: f64 = self.descriptor.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
        let norm_b: f64 = other.descriptor.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

        if norm_a > 0.0 && norm_b > 0.0 {
            Some(dot / (norm_a * norm_b))
        } else {
            None
        }
    }
}

impl Evidence for InstanceView {
    fn centroid_cam(&self) -> Vector3<f64> {
        self.centroid_cam
    }

    fn appearance_distance(&self, other: &Self) -> f64 {
        if self.class_id != other.class_id {
            return 1.0;
        }

        // Without descriptors, fall back on mask box overlap.
        let distance = match self.descriptor_similarity(other) {
            Some(cos) => (1.0 - cos) / 2.0,
            None => 1.0 - self.bbox.iou(&other.bbox),
        };
        distance.clamp(0.0, 1.0)
    }
}
