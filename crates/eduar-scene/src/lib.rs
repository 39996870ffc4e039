//! EduAR Scene - Bevy rendering for viewer sessions
//!
//! Drives an `eduar_core::Flow` through the bevy schedule: advances
//! simulated scan time, builds the per-mount scene graph, loads glTF
//! geometry and applies the session's frame snapshots to the camera and
//! model group.

pub mod camera;
pub mod models;
pub mod scene;
pub mod types;

use bevy::prelude::*;

/// Ordering of the per-frame work
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArSet {
    /// Window size and simulated time
    Flow,
    /// Spawn and despawn per-mount entities
    Scene,
    /// glTF requests and completions
    Geometry,
    /// Apply the frame snapshot
    Frame,
}

/// Plugin that renders the active viewer session
///
/// The app must insert an [`ArFlow`] resource before the first update.
pub struct EduarScenePlugin;

impl Plugin for EduarScenePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (ArSet::Flow, ArSet::Scene, ArSet::Geometry, ArSet::Frame).chain(),
        )
        .add_plugins(camera::CameraPlugin)
        .add_plugins(scene::SceneSetupPlugin)
        .add_plugins(models::ModelsPlugin);
    }
}

pub use camera::MainCamera;
pub use types::*;
