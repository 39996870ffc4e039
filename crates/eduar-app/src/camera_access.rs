//! Camera access on the desktop
//!
//! There is no camera preview surface here, so a granted session always
//! runs in placeholder mode and offers "Show 3D Model".

use bevy::prelude::*;
use eduar_core::{CameraAccess, PermissionStatus};
use tracing::debug;

#[derive(Resource, Debug, Clone)]
pub struct DesktopCamera {
    status: PermissionStatus,
    grant: bool,
}

impl DesktopCamera {
    /// `grant` is the answer every permission prompt receives
    pub fn new(grant: bool) -> Self {
        Self {
            status: PermissionStatus::Undetermined,
            grant,
        }
    }
}

impl CameraAccess for DesktopCamera {
    fn permission(&self) -> PermissionStatus {
        self.status
    }

    fn request_permission(&mut self) -> PermissionStatus {
        self.status = if self.grant {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        debug!(status = ?self.status, "Camera permission requested");
        self.status
    }

    fn preview_available(&self) -> bool {
        false
    }
}
