//! Property and scenario tests for object tracks.

use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use proptest::prelude::*;

use rust_instance_recon::geometry::SE3;
use rust_instance_recon::instance::{BoundingBox, InstanceView};
use rust_instance_recon::track::{MatchConfig, Track, TrackFrame, TrackId};

struct Volume {
    voxels: Vec<f32>,
}

fn view_at(centroid: Vector3<f64>, descriptor: Vec<f32>) -> InstanceView {
    InstanceView::new(4, 0.8, BoundingBox::new(100.0, 80.0, 180.0, 200.0), centroid)
        .with_descriptor(descriptor)
}

fn pose_strategy() -> impl Strategy<Value = SE3> {
    (
        -1.0f64..1.0,
        -1.0f64..1.0,
        -1.0f64..1.0,
        -5.0f64..5.0,
        -5.0f64..5.0,
        -5.0f64..5.0,
    )
        .prop_map(|(r, p, y, x, yy, z)| SE3 {
            rotation: UnitQuaternion::from_euler_angles(r, p, y),
            translation: Vector3::new(x, yy, z),
        })
}

/// Track with a single observation at frame 10, seen from the identity pose.
fn seed_track() -> Track<InstanceView, Volume> {
    let mut track = Track::new(TrackId::new(1));
    track.add_frame(TrackFrame::new(
        10,
        view_at(Vector3::new(0.0, 0.0, 5.0), vec![1.0, 0.0, 0.0]),
        SE3::identity(),
    ));
    track
}

/// `skew` tilts the candidate's descriptor away from the track's `[1, 0, 0]`.
fn candidate(offset_m: f64, skew: f64, gap: i64) -> TrackFrame<InstanceView> {
    let descriptor = vec![1.0, skew as f32, 0.0];
    TrackFrame::new(
        10 + gap,
        view_at(Vector3::new(offset_m, 0.0, 5.0), descriptor),
        SE3::identity(),
    )
}

proptest! {
    #[test]
    fn stored_indices_strictly_increase(steps in prop::collection::vec(1i64..5, 1..40)) {
        let mut track: Track<InstanceView, Volume> = Track::new(TrackId::new(0));
        let mut idx = 0;
        for step in &steps {
            idx += step;
            track.add_frame(TrackFrame::new(idx, view_at(Vector3::zeros(), vec![]), SE3::identity()));
        }

        prop_assert!(track.frames().windows(2).all(|w| w[0].frame_idx() < w[1].frame_idx()));
        prop_assert_eq!(track.start_time(), steps[0]);
        prop_assert_eq!(track.end_time(), idx);
    }

    #[test]
    fn relative_pose_roundtrip(poses in prop::collection::vec(pose_strategy(), 1..12)) {
        let mut track: Track<InstanceView, Volume> = Track::new(TrackId::new(0));
        for (i, pose) in poses.iter().enumerate() {
            track.add_frame(TrackFrame::new(i as i64, view_at(Vector3::zeros(), vec![]), *pose));
        }

        let first = track.frame_pose(0).unwrap();
        prop_assert!((first.to_matrix() - Matrix4::identity()).amax() < 1e-9);

        for (i, pose) in poses.iter().enumerate() {
            let rebuilt = poses[0].compose(&track.frame_pose(i).unwrap());
            prop_assert!((rebuilt.to_matrix() - pose.to_matrix()).amax() < 1e-9);
        }
        prop_assert!(track.frame_pose(poses.len()).is_none());
    }

    #[test]
    fn score_non_increasing_in_displacement(a in 0.0f64..4.0, b in 0.0f64..4.0) {
        let track = seed_track();
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            track.score_match_default(&candidate(near, 0.2, 1))
                >= track.score_match_default(&candidate(far, 0.2, 1))
        );
    }

    #[test]
    fn score_non_increasing_in_dissimilarity(a in 0.0f64..20.0, b in 0.0f64..20.0) {
        let track = seed_track();
        let (similar, different) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            track.score_match_default(&candidate(0.3, similar, 2))
                >= track.score_match_default(&candidate(0.3, different, 2))
        );
    }

    #[test]
    fn score_non_increasing_in_gap(a in 1i64..40, b in 1i64..40) {
        let track = seed_track();
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            track.score_match_default(&candidate(0.3, 0.2, short))
                >= track.score_match_default(&candidate(0.3, 0.2, long))
        );
    }

    #[test]
    fn score_in_unit_range(offset in 0.0f64..10.0, skew in 0.0f64..20.0, gap in -5i64..50) {
        let score = seed_track().score_match(&candidate(offset, skew, gap), &MatchConfig::default());
        prop_assert!((0.0..=1.0).contains(&score));
    }
}

#[test]
fn perfect_candidate_scores_one() {
    assert_relative_eq!(seed_track().score_match_default(&candidate(0.0, 0.0, 1)), 1.0, epsilon = 1e-9);
}

#[test]
fn fresh_track_is_not_eligible_until_first_frame() {
    let mut track: Track<InstanceView, Volume> = Track::new(TrackId::new(3));
    assert!(!track.is_eligible_for_reconstruction());

    track.add_frame(TrackFrame::new(0, view_at(Vector3::zeros(), vec![]), SE3::identity()));
    assert_eq!(track.len(), 1);
    assert!(track.is_eligible_for_reconstruction());
}

#[test]
fn sparse_timeline_renders_equal_columns() {
    let mut track: Track<InstanceView, Volume> = Track::new(TrackId::new(7));
    for idx in [11, 12, 13, 16] {
        track.add_frame(TrackFrame::new(idx, view_at(Vector3::zeros(), vec![]), SE3::identity()));
    }

    let art = track.ascii_art();
    let inner = art.trim_start_matches('[').trim_end_matches(']');
    let columns: Vec<&str> = inner
        .as_bytes()
        .chunks(3)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();

    let mut expected = vec!["   "; 11];
    expected.extend([" 11", " 12", " 13", "   ", "   ", " 16"]);
    assert_eq!(inner.len() % 3, 0);
    assert_eq!(columns, expected);

    let compact = track.ascii_art_compact();
    assert_eq!(compact, "[ 11 12 13       16]");
}

#[test]
fn replaced_reconstruction_survives_through_external_reference() {
    let mut track = seed_track();
    let first = Arc::new(Volume { voxels: vec![0.5; 8] });
    let engine_ref = Arc::clone(&first);

    track.set_reconstruction(first);
    let replaced = track.set_reconstruction(Arc::new(Volume { voxels: vec![] }));
    drop(replaced);

    assert_eq!(engine_ref.voxels.len(), 8);
    assert!(track.reconstruction().is_some_and(|r| r.voxels.is_empty()));
}

#[test]
fn matrix_poses_compose_like_se3() {
    let t_w0 = SE3 {
        rotation: UnitQuaternion::from_euler_angles(0.2, 0.0, -0.1),
        translation: Vector3::new(1.0, 2.0, 3.0),
    };
    let t_w1 = SE3 {
        rotation: UnitQuaternion::from_euler_angles(0.25, 0.05, -0.3),
        translation: Vector3::new(1.5, 2.0, 2.5),
    };

    let mut track: Track<InstanceView, Volume> = Track::new(TrackId::new(0));
    track.add_frame(TrackFrame::from_matrix(0, view_at(Vector3::zeros(), vec![]), t_w0.to_matrix()));
    track.add_frame(TrackFrame::from_matrix(1, view_at(Vector3::zeros(), vec![]), t_w1.to_matrix()));

    let expected = t_w0.to_matrix().try_inverse().unwrap() * t_w1.to_matrix();
    assert_relative_eq!(track.frame_pose(1).unwrap().to_matrix(), expected, epsilon = 1e-9);
}
