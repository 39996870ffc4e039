//! Viewer camera and per-frame pose updates

use bevy::prelude::*;
use eduar_core::{FrameSnapshot, SceneSpec};

use crate::types::{ArFlow, ModelGroup, SessionEntity};
use crate::ArSet;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for the viewer camera
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(Update, drive_frame.in_set(ArSet::Frame));
    }
}

/// The camera outlives viewer mounts so the UI always has a render target
fn spawn_camera(mut commands: Commands, flow: Res<ArFlow>) {
    let settings = flow.viewer_settings();
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: settings.fov_degrees.to_radians(),
            near: settings.near,
            far: settings.far,
            ..default()
        }),
        camera_transform([0.0, 0.0, settings.base_distance]),
        MainCamera,
    ));
}

/// Perspective parameters for a freshly mounted session
pub fn perspective(spec: &SceneSpec) -> PerspectiveProjection {
    PerspectiveProjection {
        fov: spec.fov_degrees.to_radians(),
        aspect_ratio: spec.aspect,
        near: spec.near,
        far: spec.far,
        ..default()
    }
}

/// Camera placed at `position`, looking at the origin with +Y up
pub fn camera_transform(position: [f32; 3]) -> Transform {
    Transform::from_translation(Vec3::from_array(position)).looking_at(Vec3::ZERO, Vec3::Y)
}

/// Model group pose for a frame; Euler angles apply in X, Y, Z order
pub fn group_transform(snapshot: &FrameSnapshot) -> Transform {
    let [x, y, z] = snapshot.group_rotation;
    Transform {
        translation: Vec3::ZERO,
        rotation: Quat::from_euler(EulerRot::XYZ, x, y, z),
        scale: Vec3::splat(snapshot.group_scale),
    }
}

/// Run one iteration of the session's render loop
fn drive_frame(
    mut flow: ResMut<ArFlow>,
    mut cameras: Query<&mut Transform, (With<MainCamera>, Without<ModelGroup>)>,
    mut groups: Query<(&SessionEntity, &mut Transform), (With<ModelGroup>, Without<MainCamera>)>,
) {
    let Some(viewer) = flow.viewer_mut() else { return };
    let Some(snapshot) = viewer.frame() else { return };

    if let Ok(mut transform) = cameras.single_mut() {
        *transform = camera_transform(snapshot.camera_position);
    }

    for (session, mut transform) in &mut groups {
        if session.token == snapshot.token {
            *transform = group_transform(&snapshot);
        }
    }
}
