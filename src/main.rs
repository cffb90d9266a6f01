use std::sync::Arc;

use anyhow::{Result, ensure};
use clap::Parser;
use nalgebra::{UnitQuaternion, Vector3};
use parking_lot::Mutex;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_instance_recon::geometry::SE3;
use rust_instance_recon::instance::{BoundingBox, InstanceView};
use rust_instance_recon::reconstruction::{ReconstructionEngine, ReconstructionHandle};
use rust_instance_recon::track::{InstanceTracker, MultiCriteria, TrackId, TrackSummary, TrackerConfig};

/// Pinhole intrinsics used to project synthetic objects into the image.
const FX: f64 = 500.0;
const CX: f64 = 320.0;
const CY: f64 = 240.0;
const DESCRIPTOR_DIM: usize = 16;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(about = "Run the instance tracker on a synthetic dynamic scene")]
struct Args {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 60)]
    frames: i64,

    /// Number of moving objects in the scene.
    #[arg(long, default_value_t = 4)]
    objects: usize,

    /// Probability that the detector misses an object in a frame.
    #[arg(long, default_value_t = 0.2)]
    miss_rate: f64,

    /// RNG seed.
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

/// Stand-in for a volumetric fusion volume; the engine keeps a handle too.
#[derive(Debug)]
struct FusionVolume {
    track: TrackId,
    integrated_frames: Mutex<usize>,
}

#[derive(Default)]
struct FusionEngine {
    volumes: Vec<ReconstructionHandle<FusionVolume>>,
}

impl ReconstructionEngine<FusionVolume> for FusionEngine {
    fn create_reconstruction(
        &mut self,
        id: TrackId,
        summary: &TrackSummary,
    ) -> Result<ReconstructionHandle<FusionVolume>> {
        info!(
            "Allocating volume for track {} ({} frames, {:.2} m baseline)",
            id, summary.len, summary.translation_spread_m
        );
        let volume = Arc::new(FusionVolume {
            track: id,
            integrated_frames: Mutex::new(0),
        });
        self.volumes.push(Arc::clone(&volume));
        Ok(volume)
    }
}

struct SceneObject {
    class_id: u32,
    start: Vector3<f64>,
    velocity: Vector3<f64>,
    descriptor: Vec<f32>,
}

fn camera_pose(i: i64) -> SE3 {
    let t = i as f64;
    SE3 {
        rotation: UnitQuaternion::from_euler_angles(0.0, 0.004 * t, 0.0),
        translation: Vector3::new(0.05 * t, 0.0, 0.02 * t),
    }
}

fn observe(obj: &SceneObject, i: i64, pose: &SE3, rng: &mut StdRng) -> Option<InstanceView> {
    let world = obj.start + obj.velocity * i as f64;
    let noise: Vector3<f64> = Vector3::new(
        rng.gen_range(-0.02..0.02),
        rng.gen_range(-0.02..0.02),
        rng.gen_range(-0.02..0.02),
    );
    let p_cam = pose.inverse().transform_point(&world) + noise;
    if p_cam.z < 0.5 {
        return None;
    }

    let u = FX * p_cam.x / p_cam.z + CX;
    let v = FX * p_cam.y / p_cam.z + CY;
    let half = FX * 0.5 / p_cam.z;
    let descriptor: Vec<f32> = obj
        .descriptor
        .iter()
        .map(|d| *d + rng.gen_range(-0.05f32..0.05))
        .collect();

    Some(
        InstanceView::new(
            obj.class_id,
            rng.gen_range(0.6..1.0),
            BoundingBox::new(u - half, v - half, u + half, v + half),
            p_cam,
        )
        .with_descriptor(descriptor),
    )
}

/// `RUST_LOG` directives if they parse, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_target(false)
        .init();
    let args = Args::parse();
    ensure!((0.0..=1.0).contains(&args.miss_rate), "miss rate must be in [0, 1]");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let scene: Vec<SceneObject> = (0..args.objects)
        .map(|k| SceneObject {
            class_id: (k % 3) as u32,
            start: Vector3::new(k as f64 * 1.5 - 2.0, 0.0, 6.0 + k as f64),
            velocity: Vector3::new(rng.gen_range(-0.03..0.03), 0.0, rng.gen_range(-0.03..0.03)),
            descriptor: (0..DESCRIPTOR_DIM).map(|_| rng.gen_range(-1.0f32..1.0)).collect(),
        })
        .collect();

    let eligibility = MultiCriteria {
        min_frames: 5,
        min_span_frames: 8,
        min_translation_spread_m: 0.2,
    };
    let mut tracker: InstanceTracker<InstanceView, FusionVolume> =
        InstanceTracker::with_policy(TrackerConfig::default(), eligibility)?;
    let mut engine = FusionEngine::default();

    for i in 0..args.frames {
        let pose = camera_pose(i);
        let mut detections = Vec::new();
        for obj in &scene {
            if rng.r#gen::<f64>() < args.miss_rate {
                continue;
            }
            detections.extend(observe(obj, i, &pose, &mut rng));
        }

        let assoc = tracker.process_frame(i, pose, detections);
        tracker.attach_reconstructions(&mut engine)?;

        // Fuse this frame into every volume whose track was extended.
        for (_, id) in assoc.matched.iter().chain(assoc.born.iter()) {
            if let Some(volume) = tracker.track(*id).and_then(|t| t.reconstruction()) {
                *volume.integrated_frames.lock() += 1;
            }
        }

        if i % 20 == 0 {
            println!(
                "Frame {}: {} live tracks, {} retired, {} volumes",
                i,
                tracker.tracks().len(),
                tracker.num_retired(),
                engine.volumes.len()
            );
        }
    }

    println!("{}", tracker.ascii_art());
    for volume in &engine.volumes {
        println!(
            "Volume for track {}: {} frames fused, {} holders",
            volume.track,
            *volume.integrated_frames.lock(),
            Arc::strong_count(volume)
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
    }

    #[test]
    fn test_log_filter_uses_env_directives() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
    }
}
