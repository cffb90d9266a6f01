//! Core ID types for object tracks.

use serde::{Deserialize, Serialize};

/// Unique identifier for an object track.
///
/// TrackIds are assigned sequentially by whoever creates tracks and stay
/// stable for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl TrackId {
    /// Create a new TrackId with the given value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_display() {
        assert_eq!(format!("{}", TrackId::new(7)), "T7");
    }

    #[test]
    fn test_track_id_ordering() {
        assert!(TrackId::new(1) < TrackId::new(2));
        assert_eq!(TrackId::new(3), TrackId(3));
    }
}
