//! Resources, components and messages shared by the scene plugins

use bevy::prelude::*;
use eduar_core::{AssetLoadFailure, Flow, Generation, LoadTicket};

/// Navigation state shared by the scene systems and the UI
#[derive(Resource, Deref, DerefMut)]
pub struct ArFlow(pub Flow);

/// Root entity owned by one viewer mount
///
/// Roots whose token no longer matches the live session are despawned
/// together with their children.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEntity {
    pub token: Generation,
}

/// Parent of the model geometry; receives rotation and scale each frame
#[derive(Component)]
pub struct ModelGroup;

/// The glTF scene attached under a [`ModelGroup`]
#[derive(Component)]
pub struct ModelGeometry {
    pub url: String,
}

#[derive(Component)]
pub struct SessionLight;

/// Completion of a geometry load, delivered back to the viewer session
#[derive(Message, Debug, Clone)]
pub struct GeometryLoaded {
    pub ticket: LoadTicket,
    pub url: String,
    pub result: Result<Handle<Scene>, AssetLoadFailure>,
}
