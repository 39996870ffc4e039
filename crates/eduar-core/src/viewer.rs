//! AR viewer render session
//!
//! Engine-agnostic state behind the 3D surface. The session describes the
//! scene to build ([`SceneSpec`]), hands out exactly one geometry
//! [`LoadRequest`], and produces one [`FrameSnapshot`] per display refresh
//! that the rendering adapter copies onto its scene graph.
//!
//! The render loop starts in `Mounting` with an empty model group and keeps
//! running while geometry loads. Load completions come back as messages
//! tagged with a [`LoadTicket`]; tickets from an earlier mount or from a
//! torn-down session are ignored.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::animation::GroupPose;
use crate::catalog::{Label, ModelRecord};
use crate::generation::{Generation, GenerationCounter};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Render surface unavailable: {0}")]
    RenderSurface(String),
    #[error("Viewer is not active ({0:?})")]
    Inactive(ViewerState),
}

/// Geometry could not be loaded; the model group stays empty
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to load {url}: {reason}")]
pub struct AssetLoadFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Render loop running, geometry not yet attached
    Mounting,
    /// Geometry load finished (attached or failed)
    Ready,
    Unmounted,
    /// Surface creation failed; terminal
    Error,
}

/// Pixel size of the rendering surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 1.0 && self.height >= 1.0
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Allowed zoom factors
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.0,
            step: 0.2,
        }
    }
}

impl ZoomLimits {
    /// Smallest step that survives rounding zoom to two decimals
    pub const MIN_STEP: f32 = 0.01;

    /// `0 < min <= 1 <= max` and a step large enough to move the zoom
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.step.is_finite()
            && self.min > 0.0
            && self.min <= 1.0
            && self.max >= 1.0
            && self.step >= Self::MIN_STEP
    }
}

/// Camera and lighting parameters for a mount
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSettings {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Camera distance from the model group at zoom 1.0
    pub base_distance: f32,
    pub zoom: ZoomLimits,
    pub ambient: LightSpec,
    pub point: PointLightSpec,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            base_distance: 5.0,
            zoom: ZoomLimits::default(),
            ambient: LightSpec {
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
            },
            point: PointLightSpec {
                light: LightSpec {
                    color: [1.0, 1.0, 1.0],
                    intensity: 1.0,
                },
                range: 100.0,
                position: [5.0, 5.0, 5.0],
            },
        }
    }
}

impl ViewerSettings {
    /// Replace unusable camera parameters with their defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if !self.zoom.is_valid() {
            warn!(zoom = ?self.zoom, "Invalid zoom limits, using defaults");
            self.zoom = defaults.zoom;
        }
        if !(self.base_distance.is_finite() && self.base_distance > 0.0) {
            warn!(base_distance = self.base_distance, "Invalid camera distance, using default");
            self.base_distance = defaults.base_distance;
        }
        if !(self.fov_degrees.is_finite() && self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            warn!(fov = self.fov_degrees, "Invalid field of view, using default");
            self.fov_degrees = defaults.fov_degrees;
        }
        let clip_ok = self.near.is_finite()
            && self.far.is_finite()
            && self.near > 0.0
            && self.near < self.far;
        if !clip_ok {
            warn!(near = self.near, far = self.far, "Invalid clip planes, using defaults");
            self.near = defaults.near;
            self.far = defaults.far;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpec {
    /// Linear RGB in 0.0-1.0
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightSpec {
    pub light: LightSpec,
    pub range: f32,
    pub position: [f32; 3],
}

/// Everything the engine needs to build the scene graph on mount
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSpec {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: [f32; 3],
    pub ambient: LightSpec,
    pub point: PointLightSpec,
    /// The model group sits at the origin
    pub group_position: [f32; 3],
}

/// Correlates an asset-load completion with the mount that asked for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: Generation,
}

impl LoadTicket {
    /// Generation of the mount that issued this ticket
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub url: String,
}

/// Camera pose controlled by zoom and reset
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    base_distance: f32,
    limits: ZoomLimits,
    zoom: f32,
    initial: [f32; 3],
    position: [f32; 3],
}

fn round_zoom(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

impl CameraRig {
    pub fn new(base_distance: f32, limits: ZoomLimits) -> Self {
        let limits = if limits.is_valid() {
            limits
        } else {
            warn!(zoom = ?limits, "Invalid zoom limits, using defaults");
            ZoomLimits::default()
        };
        let initial = [0.0, 0.0, base_distance];
        Self {
            base_distance,
            limits,
            zoom: 1.0,
            initial,
            position: initial,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    pub fn initial_position(&self) -> [f32; 3] {
        self.initial
    }

    /// Distance along the view axis to the model group
    pub fn distance(&self) -> f32 {
        self.position[2]
    }

    /// Step the zoom factor up. Returns false at the upper bound.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom >= self.limits.max {
            return false;
        }
        self.set_zoom(round_zoom(self.zoom + self.limits.step).min(self.limits.max));
        true
    }

    /// Step the zoom factor down. Returns false at the lower bound.
    pub fn zoom_out(&mut self) -> bool {
        if self.zoom <= self.limits.min {
            return false;
        }
        self.set_zoom(round_zoom(self.zoom - self.limits.step).max(self.limits.min));
        true
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.position = self.initial;
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
        self.position[2] = self.base_distance / zoom;
    }
}

/// Per-frame output copied onto the engine's scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// 1-based index of this frame within the session
    pub frame: u64,
    pub token: Generation,
    pub camera_position: [f32; 3],
    pub group_rotation: [f32; 3],
    pub group_scale: f32,
    pub geometry_attached: bool,
}

/// A label anchor mapped onto the surface
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedLabel {
    pub name: String,
    /// Surface pixel position, origin top-left. None when off the view frustum depth range.
    pub screen: Option<[f32; 2]>,
    /// Distance in front of the camera
    pub depth: f32,
}

/// A mounted viewer for one catalog record
#[derive(Debug, Clone)]
pub struct ViewerSession {
    record: ModelRecord,
    settings: ViewerSettings,
    surface: SurfaceSize,
    state: ViewerState,
    error: Option<ViewerError>,
    camera: CameraRig,
    pose: GroupPose,
    frames: u64,
    generation: GenerationCounter,
    pending_load: Option<LoadRequest>,
    awaiting: Option<LoadTicket>,
    geometry_attached: bool,
    load_failure: Option<AssetLoadFailure>,
}

impl ViewerSession {
    /// Build the scene description and start the render loop
    ///
    /// A surface that cannot be rendered to puts the session straight into
    /// `Error`; nothing is scheduled in that case.
    pub fn mount(record: &ModelRecord, surface: SurfaceSize, settings: ViewerSettings) -> Self {
        let settings = settings.validated();
        let camera = CameraRig::new(settings.base_distance, settings.zoom.clone());
        let mut session = Self {
            record: record.clone(),
            settings,
            surface,
            state: ViewerState::Mounting,
            error: None,
            camera,
            pose: GroupPose::default(),
            frames: 0,
            generation: GenerationCounter::new(),
            pending_load: None,
            awaiting: None,
            geometry_attached: false,
            load_failure: None,
        };

        if !surface.is_usable() {
            let err = ViewerError::RenderSurface(format!(
                "surface is {}x{}",
                surface.width, surface.height
            ));
            warn!(model = %record.id, error = %err, "Viewer mount failed");
            session.state = ViewerState::Error;
            session.error = Some(err);
            return session;
        }

        let token = session.generation.bump();
        session.pending_load = Some(LoadRequest {
            ticket: LoadTicket { generation: token },
            url: record.model_url.clone(),
        });
        info!(model = %record.id, %token, "Viewer mounted");
        session
    }

    pub fn record(&self) -> &ModelRecord {
        &self.record
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    /// User-visible message for a failed mount
    pub fn error(&self) -> Option<&ViewerError> {
        self.error.as_ref()
    }

    /// User-visible message when geometry could not be loaded
    pub fn load_failure(&self) -> Option<&AssetLoadFailure> {
        self.load_failure.as_ref()
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn pose(&self) -> &GroupPose {
        &self.pose
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn geometry_attached(&self) -> bool {
        self.geometry_attached
    }

    pub fn labels(&self) -> &[Label] {
        &self.record.labels
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    fn is_active(&self) -> bool {
        matches!(self.state, ViewerState::Mounting | ViewerState::Ready)
    }

    /// Token of the current render-loop registration
    pub fn loop_token(&self) -> Generation {
        self.generation.current()
    }

    /// Whether a callback registered under `token` may still touch the scene
    pub fn is_live(&self, token: Generation) -> bool {
        self.is_active() && self.generation.is_current(token)
    }

    /// Scene graph description, None once the session is inactive
    pub fn scene_spec(&self) -> Option<SceneSpec> {
        if !self.is_active() {
            return None;
        }
        Some(SceneSpec {
            fov_degrees: self.settings.fov_degrees,
            aspect: self.surface.aspect(),
            near: self.settings.near,
            far: self.settings.far,
            camera_position: self.camera.position(),
            ambient: self.settings.ambient,
            point: self.settings.point,
            group_position: [0.0; 3],
        })
    }

    /// Hand the geometry request to the loader. Yields at most once per mount.
    pub fn take_load_request(&mut self) -> Option<LoadRequest> {
        let request = self.pending_load.take()?;
        self.awaiting = Some(request.ticket);
        debug!(model = %self.record.id, url = %request.url, "Geometry load requested");
        Some(request)
    }

    /// Deliver a load completion. Returns false when the ticket is stale.
    pub fn on_asset_loaded(&mut self, ticket: LoadTicket, result: Result<(), AssetLoadFailure>) -> bool {
        if !self.is_live(ticket.generation) || self.awaiting != Some(ticket) {
            debug!(model = %self.record.id, "Dropping stale asset load completion");
            return false;
        }
        self.awaiting = None;

        match result {
            Ok(()) => {
                self.geometry_attached = true;
                info!(model = %self.record.id, frames = self.frames, "Geometry attached");
            }
            Err(failure) => {
                warn!(model = %self.record.id, error = %failure, "Geometry load failed");
                self.load_failure = Some(failure);
            }
        }
        self.state = ViewerState::Ready;
        true
    }

    /// Run one iteration of the render loop
    ///
    /// Returns None without side effects once the session is unmounted or
    /// failed, so no further frames are produced.
    pub fn frame(&mut self) -> Option<FrameSnapshot> {
        if !self.is_active() {
            return None;
        }
        self.frames += 1;
        self.record.animation.advance(&mut self.pose);
        Some(FrameSnapshot {
            frame: self.frames,
            token: self.generation.current(),
            camera_position: self.camera.position(),
            group_rotation: self.pose.rotation,
            group_scale: self.pose.scale,
            geometry_attached: self.geometry_attached,
        })
    }

    pub fn zoom_in(&mut self) -> Result<bool, ViewerError> {
        self.ensure_active()?;
        Ok(self.camera.zoom_in())
    }

    pub fn zoom_out(&mut self) -> Result<bool, ViewerError> {
        self.ensure_active()?;
        Ok(self.camera.zoom_out())
    }

    /// Restore zoom 1.0 and the initial camera pose
    pub fn reset(&mut self) -> Result<(), ViewerError> {
        self.ensure_active()?;
        self.camera.reset();
        Ok(())
    }

    pub fn resize(&mut self, surface: SurfaceSize) {
        if surface.is_usable() {
            self.surface = surface;
        }
    }

    /// Cancel the render loop and any outstanding load. Idempotent.
    pub fn unmount(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        let token = self.generation.bump();
        self.state = ViewerState::Unmounted;
        self.pending_load = None;
        self.awaiting = None;
        info!(model = %self.record.id, frames = self.frames, %token, "Viewer unmounted");
        true
    }

    fn ensure_active(&self) -> Result<(), ViewerError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ViewerError::Inactive(self.state))
        }
    }

    /// Project every label anchor onto the surface, in record order
    pub fn project_labels(&self) -> Vec<ProjectedLabel> {
        let focal = 1.0 / (self.settings.fov_degrees.to_radians() / 2.0).tan();
        let aspect = self.surface.aspect();
        let camera = self.camera.position();

        self.record
            .labels
            .iter()
            .map(|label| {
                let local = label.position.map(|v| v * self.pose.scale);
                let world = rotate_xyz(local, self.pose.rotation);
                let view = [
                    world[0] - camera[0],
                    world[1] - camera[1],
                    world[2] - camera[2],
                ];
                let depth = -view[2];
                let screen = (depth > self.settings.near && depth < self.settings.far).then(|| {
                    let ndc_x = focal / aspect * view[0] / depth;
                    let ndc_y = focal * view[1] / depth;
                    [
                        (ndc_x + 1.0) / 2.0 * self.surface.width,
                        (1.0 - ndc_y) / 2.0 * self.surface.height,
                    ]
                });
                ProjectedLabel {
                    name: label.name.clone(),
                    screen,
                    depth,
                }
            })
            .collect()
    }
}

/// Rotate by Euler angles in XYZ order (R = Rx * Ry * Rz)
fn rotate_xyz(v: [f32; 3], angles: [f32; 3]) -> [f32; 3] {
    let (sx, cx) = angles[0].sin_cos();
    let (sy, cy) = angles[1].sin_cos();
    let (sz, cz) = angles[2].sin_cos();

    let v = [v[0] * cz - v[1] * sz, v[0] * sz + v[1] * cz, v[2]];
    let v = [v[0] * cy + v[2] * sy, v[1], -v[0] * sy + v[2] * cy];
    [v[0], v[1] * cx - v[2] * sx, v[1] * sx + v[2] * cx]
}
