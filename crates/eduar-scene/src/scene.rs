//! Scene setup - per-mount lights and model group

use bevy::prelude::*;
use eduar_core::viewer::{LightSpec, PointLightSpec};
use eduar_core::{Generation, SceneSpec, SurfaceSize};
use tracing::{debug, info};

use crate::camera::{perspective, MainCamera};
use crate::types::{ArFlow, ModelGroup, SessionEntity, SessionLight};
use crate::ArSet;

/// Ambient brightness per unit of session intensity
pub const AMBIENT_BRIGHTNESS_SCALE: f32 = 250.0;

/// Point light lumens per unit of session intensity
pub const POINT_LUMENS_SCALE: f32 = 1_000_000.0;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
            .add_systems(Update, (sync_surface, advance_flow).chain().in_set(ArSet::Flow))
            .add_systems(Update, sync_session_entities.in_set(ArSet::Scene));
    }
}

/// Keep the flow's render surface in step with the primary window
fn sync_surface(windows: Query<&Window>, mut flow: ResMut<ArFlow>) {
    let Ok(window) = windows.single() else { return };
    let surface = SurfaceSize::new(window.width(), window.height());
    if flow.surface() != surface {
        debug!(width = surface.width, height = surface.height, "Surface resized");
        flow.set_surface(surface);
    }
}

/// Feed frame time into the scan timeout
fn advance_flow(time: Res<Time>, mut flow: ResMut<ArFlow>) {
    flow.tick(time.delta());
}

/// Despawn entities of finished mounts and build the graph for a new one
fn sync_session_entities(
    mut commands: Commands,
    flow: Res<ArFlow>,
    roots: Query<(Entity, &SessionEntity)>,
    mut cameras: Query<&mut Projection, With<MainCamera>>,
) {
    let live = flow
        .viewer()
        .and_then(|viewer| viewer.scene_spec().map(|spec| (viewer.loop_token(), spec)));

    let mut built = false;
    let mut despawned = false;
    for (entity, session) in &roots {
        match &live {
            Some((token, _)) if *token == session.token => built = true,
            _ => {
                debug!(token = %session.token, "Despawning stale session entity");
                commands.entity(entity).despawn();
                despawned = true;
            }
        }
    }

    let Some((token, spec)) = live else {
        if despawned {
            commands.insert_resource(AmbientLight::default());
            info!("Scene graph torn down");
        }
        return;
    };
    if built {
        return;
    }

    spawn_session(&mut commands, token, &spec);
    if let Ok(mut projection) = cameras.single_mut() {
        *projection = Projection::Perspective(perspective(&spec));
    }
}

fn spawn_session(commands: &mut Commands, token: Generation, spec: &SceneSpec) {
    commands.insert_resource(ambient_light(&spec.ambient));

    commands.spawn((
        point_light(&spec.point),
        Transform::from_translation(Vec3::from_array(spec.point.position)),
        SessionLight,
        SessionEntity { token },
    ));

    commands.spawn((
        Transform::from_translation(Vec3::from_array(spec.group_position)),
        Visibility::default(),
        ModelGroup,
        SessionEntity { token },
    ));

    info!(%token, "Scene graph built");
}

fn linear(rgb: [f32; 3]) -> Color {
    Color::linear_rgb(rgb[0], rgb[1], rgb[2])
}

pub fn ambient_light(spec: &LightSpec) -> AmbientLight {
    AmbientLight {
        color: linear(spec.color),
        brightness: spec.intensity * AMBIENT_BRIGHTNESS_SCALE,
        ..default()
    }
}

pub fn point_light(spec: &PointLightSpec) -> PointLight {
    PointLight {
        color: linear(spec.light.color),
        intensity: spec.light.intensity * POINT_LUMENS_SCALE,
        range: spec.range,
        shadows_enabled: false,
        ..default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduar_core::{CameraAccess, Catalog, Flow, PermissionStatus, ScanSettings, ViewerSettings};

    struct NoPreview;

    impl CameraAccess for NoPreview {
        fn permission(&self) -> PermissionStatus {
            PermissionStatus::Granted
        }

        fn request_permission(&mut self) -> PermissionStatus {
            PermissionStatus::Granted
        }

        fn preview_available(&self) -> bool {
            false
        }
    }

    fn show(flow: &mut Flow, id: &str) {
        let scan = flow.pick(id).unwrap();
        scan.check_permission(&mut NoPreview).unwrap();
        flow.show_model().unwrap();
    }

    fn app() -> App {
        let flow = Flow::new(
            Catalog::builtin().unwrap(),
            ScanSettings::default(),
            ViewerSettings::default(),
            SurfaceSize::new(1280.0, 720.0),
        );
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(ArFlow(flow))
            .add_plugins(SceneSetupPlugin);
        app
    }

    fn count<F: bevy::ecs::query::QueryFilter>(app: &mut App) -> usize {
        let world = app.world_mut();
        world.query_filtered::<Entity, F>().iter(world).count()
    }

    #[test]
    fn test_back_despawns_session_graph() {
        let mut app = app();
        show(&mut app.world_mut().resource_mut::<ArFlow>(), "motor");
        app.update();

        assert_eq!(count::<With<ModelGroup>>(&mut app), 1);
        assert_eq!(count::<With<SessionLight>>(&mut app), 1);
        let brightness = app.world().resource::<AmbientLight>().brightness;
        assert!((brightness - 200.0).abs() < 1e-3);

        assert!(app.world_mut().resource_mut::<ArFlow>().back());
        app.update();

        assert_eq!(count::<With<ModelGroup>>(&mut app), 0);
        assert_eq!(count::<With<SessionLight>>(&mut app), 0);
        assert_eq!(count::<With<SessionEntity>>(&mut app), 0);
        let brightness = app.world().resource::<AmbientLight>().brightness;
        assert_eq!(brightness, AmbientLight::default().brightness);
    }

    #[test]
    fn test_remount_replaces_session_graph() {
        let mut app = app();
        show(&mut app.world_mut().resource_mut::<ArFlow>(), "motor");
        app.update();
        show(&mut app.world_mut().resource_mut::<ArFlow>(), "heart");
        app.update();

        let live = app.world().resource::<ArFlow>().viewer().unwrap().loop_token();
        let world = app.world_mut();
        let tokens: Vec<Generation> = world
            .query_filtered::<&SessionEntity, With<ModelGroup>>()
            .iter(world)
            .map(|session| session.token)
            .collect();
        assert_eq!(tokens, vec![live]);
    }

    #[test]
    fn test_default_lights() {
        let settings = ViewerSettings::default();

        let ambient = ambient_light(&settings.ambient);
        assert!((ambient.brightness - 200.0).abs() < 1e-3);
        assert_eq!(ambient.color, Color::linear_rgb(1.0, 1.0, 1.0));

        let point = point_light(&settings.point);
        assert_eq!(point.range, 100.0);
        assert_eq!(point.intensity, POINT_LUMENS_SCALE);
        assert!(!point.shadows_enabled);
        assert_eq!(settings.point.position, [5.0, 5.0, 5.0]);
    }
}
