//! Handles to externally owned volumetric reconstructions.
//!
//! The fusion engine that builds object volumes lives outside this crate.
//! Tracks only store, return and replace handles to its volumes; they never
//! create or destroy one.
//!
//! A handle is reference counted. Both the track and the engine's active
//! fusion process may hold it at the same time, and the volume is released
//! when the last holder lets go, which may be long after the track is gone.
//! Synchronizing access to the volume's contents is up to the volume type
//! itself (e.g. a `parking_lot::Mutex` inside `R`).

use std::sync::Arc;

use anyhow::Result;

use crate::track::{TrackId, TrackSummary};

/// Shared reference to a reconstruction of type `R`.
pub type ReconstructionHandle<R> = Arc<R>;

/// Source of new reconstructions, implemented by the external fusion engine.
pub trait ReconstructionEngine<R> {
    /// Allocate a reconstruction for the track `id`.
    fn create_reconstruction(
        &mut self,
        id: TrackId,
        summary: &TrackSummary,
    ) -> Result<ReconstructionHandle<R>>;
}
