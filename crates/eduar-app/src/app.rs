//! Bevy application setup

use anyhow::{anyhow, Result};
use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use eduar_core::{
    Catalog, FilePreferenceStore, Flow, MemoryPreferenceStore, PreferenceStore, SurfaceSize,
    ThemeStore,
};
use eduar_scene::{ArFlow, EduarScenePlugin};
use std::path::Path;
use tracing::{info, warn};

use crate::camera_access::DesktopCamera;
use crate::config::Config;
use crate::ui::{ThemeState, UiPlugin};

/// Initial window size before the first resize reaches the flow
const INITIAL_SURFACE: SurfaceSize = SurfaceSize {
    width: 1280.0,
    height: 720.0,
};

fn open_preferences(path: &Path) -> Box<dyn PreferenceStore> {
    match FilePreferenceStore::open(path) {
        Ok(store) => {
            info!(path = %path.display(), "Preferences opened");
            Box::new(store)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Preferences unavailable, keeping them in memory");
            Box::new(MemoryPreferenceStore::new())
        }
    }
}

/// Run the Bevy application
pub fn run(config: Config, catalog: Catalog) -> Result<()> {
    let theme = ThemeStore::load(open_preferences(Path::new(&config.app.preferences_path)));
    let flow = Flow::new(
        catalog,
        config.to_scan_settings(),
        config.to_viewer_settings(),
        INITIAL_SURFACE,
    );

    let exit = App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: config.app.window_title.clone(),
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Models are fetched from plain URLs without .meta files
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Picking must be registered before EguiPlugin so egui can detect it
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(ArFlow(flow))
        .insert_resource(ThemeState::new(theme))
        .insert_resource(DesktopCamera::new(config.scan.grant_camera))
        .add_plugins(EduarScenePlugin)
        .add_plugins(UiPlugin)
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(anyhow!("EduAR exited with code {}", code)),
    }
}
