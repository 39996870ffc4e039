//! Marker scan session
//!
//! State machine gating entry into the viewer:
//!
//! ```text
//! AwaitingPermission -> Idle -> Scanning -> Detected
//!         |               |        |
//!         v               +--------+--> Cancelled
//! PermissionDenied --retry--> Idle
//! ```
//!
//! Scanning ends either when the timeout elapses or when a detection signal
//! carrying the current generation arrives. Cancelling bumps the generation
//! so no late signal or timeout can complete a dead session.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::generation::{Generation, GenerationCounter};

/// How long a scan runs before the marker counts as detected
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScanError {
    #[error("Cannot {action} while {state:?}")]
    InvalidTransition { action: &'static str, state: ScanState },
    #[error("Camera permission denied")]
    PermissionDenied,
}

/// Camera permission as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Undetermined,
    Granted,
    Denied,
}

/// Device camera boundary
pub trait CameraAccess {
    /// Current permission without prompting
    fn permission(&self) -> PermissionStatus;
    /// Prompt the user and return the outcome
    fn request_permission(&mut self) -> PermissionStatus;
    /// Whether a live preview surface exists on this platform
    fn preview_available(&self) -> bool;
}

/// Which physical camera feeds the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraFacing {
    #[default]
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    AwaitingPermission,
    Idle,
    Scanning,
    Detected,
    PermissionDenied,
    Cancelled,
}

impl ScanState {
    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Detected | ScanState::Cancelled)
    }
}

/// Scan tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

/// One pass through the scan flow for a selected model
#[derive(Debug, Clone)]
pub struct ScanSession {
    model_id: String,
    state: ScanState,
    settings: ScanSettings,
    facing: CameraFacing,
    placeholder: bool,
    elapsed: Duration,
    generation: GenerationCounter,
}

impl ScanSession {
    pub fn new(model_id: &str, settings: ScanSettings) -> Self {
        Self {
            model_id: model_id.to_string(),
            state: ScanState::AwaitingPermission,
            settings,
            facing: CameraFacing::default(),
            placeholder: false,
            elapsed: Duration::ZERO,
            generation: GenerationCounter::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// True when the platform has no preview and the scan can be skipped
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Token a detector must present while scanning
    pub fn token(&self) -> Generation {
        self.generation.current()
    }

    /// Time left before the timeout completes the scan
    pub fn remaining(&self) -> Option<Duration> {
        (self.state == ScanState::Scanning).then(|| self.settings.timeout.saturating_sub(self.elapsed))
    }

    /// Resolve the initial permission check
    pub fn check_permission(&mut self, camera: &mut dyn CameraAccess) -> Result<ScanState, ScanError> {
        if self.state != ScanState::AwaitingPermission {
            return Err(self.invalid("check permission"));
        }

        let status = match camera.permission() {
            PermissionStatus::Undetermined => camera.request_permission(),
            status => status,
        };
        self.apply_permission(status, camera);
        Ok(self.state)
    }

    /// Ask again after a denial
    pub fn retry(&mut self, camera: &mut dyn CameraAccess) -> Result<ScanState, ScanError> {
        if self.state != ScanState::PermissionDenied {
            return Err(self.invalid("retry"));
        }
        let status = camera.request_permission();
        self.apply_permission(status, camera);
        Ok(self.state)
    }

    fn apply_permission(&mut self, status: PermissionStatus, camera: &dyn CameraAccess) {
        if status == PermissionStatus::Granted {
            self.placeholder = !camera.preview_available();
            self.state = ScanState::Idle;
            info!(model = %self.model_id, placeholder = self.placeholder, "Camera ready");
        } else {
            self.state = ScanState::PermissionDenied;
            warn!(model = %self.model_id, "Camera permission denied");
        }
    }

    /// Begin scanning and arm the timeout. Returns the detection token.
    pub fn start_scan(&mut self) -> Result<Generation, ScanError> {
        match self.state {
            ScanState::Idle => {
                self.state = ScanState::Scanning;
                self.elapsed = Duration::ZERO;
                let token = self.generation.bump();
                debug!(model = %self.model_id, %token, "Scan started");
                Ok(token)
            }
            ScanState::PermissionDenied => Err(ScanError::PermissionDenied),
            _ => Err(self.invalid("start scan")),
        }
    }

    /// Advance simulated time. Returns true on the tick that completes the scan.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if self.state != ScanState::Scanning {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.settings.timeout {
            self.complete("timeout");
            true
        } else {
            false
        }
    }

    /// Deliver a detection from a marker detector. Stale tokens are ignored.
    pub fn detection_signal(&mut self, token: Generation) -> bool {
        if self.state != ScanState::Scanning || !self.generation.is_current(token) {
            debug!(model = %self.model_id, %token, state = ?self.state, "Ignoring stale detection");
            return false;
        }
        self.complete("signal");
        true
    }

    /// Skip scanning on platforms without a camera preview
    pub fn show_model(&mut self) -> Result<(), ScanError> {
        if self.state != ScanState::Idle || !self.placeholder {
            return Err(self.invalid("show model"));
        }
        self.complete("placeholder");
        Ok(())
    }

    /// Abort the session. Returns false if it had already finished.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let token = self.generation.bump();
        debug!(model = %self.model_id, from = ?self.state, %token, "Scan cancelled");
        self.state = ScanState::Cancelled;
        self.elapsed = Duration::ZERO;
        true
    }

    pub fn toggle_facing(&mut self) -> CameraFacing {
        self.facing = match self.facing {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        };
        self.facing
    }

    fn complete(&mut self, via: &str) {
        self.state = ScanState::Detected;
        self.generation.bump();
        info!(model = %self.model_id, via, "Marker detected");
    }

    fn invalid(&self, action: &'static str) -> ScanError {
        ScanError::InvalidTransition {
            action,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCamera {
        status: PermissionStatus,
        grant_on_request: bool,
        preview: bool,
        requests: usize,
    }

    impl FakeCamera {
        fn granted() -> Self {
            Self {
                status: PermissionStatus::Granted,
                grant_on_request: true,
                preview: true,
                requests: 0,
            }
        }
    }

    impl CameraAccess for FakeCamera {
        fn permission(&self) -> PermissionStatus {
            self.status
        }

        fn request_permission(&mut self) -> PermissionStatus {
            self.requests += 1;
            self.status = if self.grant_on_request {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
            self.status
        }

        fn preview_available(&self) -> bool {
            self.preview
        }
    }

    fn idle_session() -> ScanSession {
        let mut session = ScanSession::new("motor", ScanSettings::default());
        session.check_permission(&mut FakeCamera::granted()).unwrap();
        assert_eq!(session.state(), ScanState::Idle);
        session
    }

    #[test]
    fn test_timeout_detects_exactly_once() {
        let mut session = idle_session();
        session.start_scan().unwrap();

        assert!(!session.tick(Duration::from_secs(2)));
        assert_eq!(session.state(), ScanState::Scanning);
        assert_eq!(session.remaining(), Some(Duration::from_secs(3)));

        let mut detections = 0;
        for _ in 0..10 {
            if session.tick(Duration::from_secs(1)) {
                detections += 1;
            }
        }
        assert_eq!(detections, 1);
        assert_eq!(session.state(), ScanState::Detected);
    }

    #[test]
    fn test_huge_tick_saturates() {
        let mut session = idle_session();
        session.start_scan().unwrap();

        assert!(!session.tick(Duration::from_secs(1)));
        assert!(session.tick(Duration::MAX));
        assert_eq!(session.state(), ScanState::Detected);
    }

    #[test]
    fn test_cancel_before_timeout_never_detects() {
        let mut session = idle_session();
        let token = session.start_scan().unwrap();
        session.tick(Duration::from_secs(1));

        assert!(session.cancel());
        assert_eq!(session.state(), ScanState::Cancelled);

        assert!(!session.tick(DEFAULT_SCAN_TIMEOUT * 3));
        assert!(!session.detection_signal(token));
        assert_eq!(session.state(), ScanState::Cancelled);
        assert!(!session.cancel());
    }

    #[test]
    fn test_detection_signal_requires_current_token() {
        let mut session = idle_session();
        let stale = session.token();
        let token = session.start_scan().unwrap();

        assert!(!session.detection_signal(stale));
        assert_eq!(session.state(), ScanState::Scanning);

        assert!(session.detection_signal(token));
        assert_eq!(session.state(), ScanState::Detected);
        assert!(!session.detection_signal(token));
    }

    #[test]
    fn test_permission_prompt_then_denied_then_retry() {
        let mut camera = FakeCamera {
            status: PermissionStatus::Undetermined,
            grant_on_request: false,
            preview: true,
            requests: 0,
        };
        let mut session = ScanSession::new("heart", ScanSettings::default());

        assert_eq!(session.check_permission(&mut camera).unwrap(), ScanState::PermissionDenied);
        assert_eq!(camera.requests, 1);
        assert_eq!(session.start_scan(), Err(ScanError::PermissionDenied));

        camera.grant_on_request = true;
        assert_eq!(session.retry(&mut camera).unwrap(), ScanState::Idle);
        assert_eq!(camera.requests, 2);
        assert!(session.retry(&mut camera).is_err());
    }

    #[test]
    fn test_denied_permission_is_not_reprompted_on_check() {
        let mut camera = FakeCamera {
            status: PermissionStatus::Denied,
            grant_on_request: true,
            preview: true,
            requests: 0,
        };
        let mut session = ScanSession::new("heart", ScanSettings::default());
        assert_eq!(session.check_permission(&mut camera).unwrap(), ScanState::PermissionDenied);
        assert_eq!(camera.requests, 0);
        assert!(session.check_permission(&mut camera).is_err());
    }

    #[test]
    fn test_placeholder_bypasses_scanning() {
        let mut camera = FakeCamera {
            preview: false,
            ..FakeCamera::granted()
        };
        let mut session = ScanSession::new("earth", ScanSettings::default());
        session.check_permission(&mut camera).unwrap();
        assert!(session.is_placeholder());

        session.show_model().unwrap();
        assert_eq!(session.state(), ScanState::Detected);

        let mut with_preview = idle_session();
        assert!(with_preview.show_model().is_err());
    }

    #[test]
    fn test_start_scan_twice_is_rejected() {
        let mut session = idle_session();
        session.start_scan().unwrap();
        assert!(matches!(
            session.start_scan(),
            Err(ScanError::InvalidTransition { state: ScanState::Scanning, .. })
        ));
    }

    #[test]
    fn test_toggle_facing() {
        let mut session = idle_session();
        assert_eq!(session.facing(), CameraFacing::Back);
        assert_eq!(session.toggle_facing(), CameraFacing::Front);
        assert_eq!(session.toggle_facing(), CameraFacing::Back);
    }
}
