//! glTF model loading for the mounted viewer

use bevy::asset::LoadState;
use bevy::prelude::*;
use eduar_core::{AssetLoadFailure, LoadTicket};
use tracing::{debug, info, warn};

use crate::types::{ArFlow, GeometryLoaded, ModelGeometry, ModelGroup, SessionEntity};
use crate::ArSet;

/// The glTF currently being fetched for the mounted viewer
#[derive(Resource, Default)]
pub struct PendingGeometry {
    load: Option<PendingLoad>,
}

struct PendingLoad {
    ticket: LoadTicket,
    url: String,
    handle: Handle<Gltf>,
}

/// Plugin for model loading
pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingGeometry>()
            .add_message::<GeometryLoaded>()
            .add_systems(
                Update,
                (request_geometry, poll_geometry, attach_geometry)
                    .chain()
                    .in_set(ArSet::Geometry),
            );
    }
}

/// Start loading the geometry a fresh mount asked for
fn request_geometry(
    mut flow: ResMut<ArFlow>,
    asset_server: Res<AssetServer>,
    mut pending: ResMut<PendingGeometry>,
) {
    let Some(viewer) = flow.viewer_mut() else { return };
    let Some(request) = viewer.take_load_request() else { return };

    info!(url = %request.url, "Starting to load model");
    let handle: Handle<Gltf> = asset_server.load(request.url.clone());
    if let Some(previous) = pending.load.replace(PendingLoad {
        ticket: request.ticket,
        url: request.url,
        handle,
    }) {
        debug!(url = %previous.url, "Superseded pending model load");
    }
}

/// Check loading state and turn a finished load into a message
fn poll_geometry(
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    mut pending: ResMut<PendingGeometry>,
    mut loaded: MessageWriter<GeometryLoaded>,
) {
    let Some(load) = pending.load.as_ref() else { return };

    let result = match asset_server.get_load_state(load.handle.id()) {
        Some(LoadState::Loaded) => gltf_assets
            .get(&load.handle)
            .and_then(gltf_scene)
            .ok_or_else(|| AssetLoadFailure {
                url: load.url.clone(),
                reason: "glTF contains no scenes".to_string(),
            }),
        Some(LoadState::Failed(err)) => Err(AssetLoadFailure {
            url: load.url.clone(),
            reason: err.to_string(),
        }),
        _ => return,
    };

    if let Some(load) = pending.load.take() {
        loaded.write(GeometryLoaded {
            ticket: load.ticket,
            url: load.url,
            result,
        });
    }
}

/// Default scene, falling back to the first one
fn gltf_scene(gltf: &Gltf) -> Option<Handle<Scene>> {
    gltf.default_scene
        .clone()
        .or_else(|| gltf.scenes.first().cloned())
}

/// Hand completions to the session and attach accepted geometry
fn attach_geometry(
    mut commands: Commands,
    mut flow: ResMut<ArFlow>,
    mut loaded: MessageReader<GeometryLoaded>,
    groups: Query<(Entity, &SessionEntity), With<ModelGroup>>,
) {
    for message in loaded.read() {
        let Some(viewer) = flow.viewer_mut() else {
            debug!(url = %message.url, "No viewer mounted, dropping model");
            continue;
        };

        let outcome = message.result.as_ref().map(|_| ()).map_err(Clone::clone);
        if !viewer.on_asset_loaded(message.ticket, outcome) {
            continue;
        }
        let Ok(scene) = &message.result else { continue };

        let token = message.ticket.generation();
        let Some((group, _)) = groups.iter().find(|(_, session)| session.token == token) else {
            warn!(url = %message.url, %token, "Model group missing, geometry not attached");
            continue;
        };

        let child = commands
            .spawn((
                SceneRoot(scene.clone()),
                Transform::default(),
                ModelGeometry {
                    url: message.url.clone(),
                },
            ))
            .id();
        commands.entity(group).add_child(child);
        info!(url = %message.url, "Model attached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneSetupPlugin;
    use eduar_core::{
        CameraAccess, Catalog, Flow, PermissionStatus, ScanSettings, SurfaceSize, ViewerSettings, ViewerState,
    };

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
            .configure_sets(Update, (ArSet::Scene, ArSet::Geometry).chain())
            .add_plugins(SceneSetupPlugin)
            .add_message::<GeometryLoaded>()
            .add_systems(Update, attach_geometry.in_set(ArSet::Geometry));
        app
    }

    /// Mount a model and return the ticket of its geometry request
    fn mount(app: &mut App, id: &str) -> LoadTicket {
        let ticket = {
            let mut flow = app.world_mut().resource_mut::<ArFlow>();
            let scan = flow.pick(id).unwrap();
            scan.check_permission(&mut NoPreview).unwrap();
            flow.show_model().unwrap();
            flow.viewer_mut().unwrap().take_load_request().unwrap().ticket
        };
        app.update();
        ticket
    }

    fn loaded(ticket: LoadTicket) -> GeometryLoaded {
        GeometryLoaded {
            ticket,
            url: "models/motor.glb".to_string(),
            result: Ok(Handle::default()),
        }
    }

    fn geometry(app: &mut App) -> Vec<Entity> {
        let world = app.world_mut();
        world
            .query_filtered::<Entity, With<ModelGeometry>>()
            .iter(world)
            .collect()
    }

    #[test]
    fn test_stale_completion_spawns_nothing() {
        let mut app = app();
        let stale = mount(&mut app, "motor");
        let current = mount(&mut app, "heart");
        assert_ne!(stale, current);

        app.world_mut().write_message(loaded(stale));
        app.update();

        assert!(geometry(&mut app).is_empty());
        let flow = app.world().resource::<ArFlow>();
        let viewer = flow.viewer().unwrap();
        assert_eq!(viewer.state(), ViewerState::Mounting);
        assert!(!viewer.geometry_attached());
    }

    #[test]
    fn test_current_completion_attaches_under_group() {
        let mut app = app();
        let ticket = mount(&mut app, "motor");

        app.world_mut().write_message(loaded(ticket));
        app.update();

        let children = geometry(&mut app);
        assert_eq!(children.len(), 1);
        let parent = app.world().get::<ChildOf>(children[0]).unwrap().parent();
        assert!(app.world().get::<ModelGroup>(parent).is_some());
        assert!(app.world().resource::<ArFlow>().viewer().unwrap().geometry_attached());
    }

    #[test]
    fn test_completion_after_back_is_dropped() {
        let mut app = app();
        let ticket = mount(&mut app, "motor");
        assert!(app.world_mut().resource_mut::<ArFlow>().back());
        app.update();

        app.world_mut().write_message(loaded(ticket));
        app.update();

        assert!(geometry(&mut app).is_empty());
    }
}
