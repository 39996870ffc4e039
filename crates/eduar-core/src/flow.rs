//! Navigation between browser, scanner and viewer
//!
//! The flow owns the catalog and at most one live session. Picking a model
//! selects it and opens a scan session; detection hands the selection to a
//! freshly mounted viewer; going back tears the session down and clears the
//! selection.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::catalog::{Catalog, CatalogError};
use crate::scan::{ScanError, ScanSession, ScanSettings, ScanState};
use crate::viewer::{SurfaceSize, ViewerSession, ViewerSettings};

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("No scan session is active")]
    NoScan,
}

/// The screen currently shown
#[derive(Debug)]
pub enum Screen {
    Browser,
    Scanner(ScanSession),
    Viewer(ViewerSession),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Browser => "browser",
            Screen::Scanner(_) => "scanner",
            Screen::Viewer(_) => "viewer",
        }
    }
}

pub struct Flow {
    catalog: Catalog,
    browser: Browser,
    screen: Screen,
    scan_settings: ScanSettings,
    viewer_settings: ViewerSettings,
    surface: SurfaceSize,
}

impl Flow {
    pub fn new(
        catalog: Catalog,
        scan_settings: ScanSettings,
        viewer_settings: ViewerSettings,
        surface: SurfaceSize,
    ) -> Self {
        Self {
            catalog,
            browser: Browser::default(),
            screen: Screen::Browser,
            scan_settings,
            viewer_settings: viewer_settings.validated(),
            surface,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Settings every viewer is mounted with
    pub fn viewer_settings(&self) -> &ViewerSettings {
        &self.viewer_settings
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn scan(&self) -> Option<&ScanSession> {
        match &self.screen {
            Screen::Scanner(scan) => Some(scan),
            _ => None,
        }
    }

    pub fn scan_mut(&mut self) -> Option<&mut ScanSession> {
        match &mut self.screen {
            Screen::Scanner(scan) => Some(scan),
            _ => None,
        }
    }

    pub fn viewer(&self) -> Option<&ViewerSession> {
        match &self.screen {
            Screen::Viewer(viewer) => Some(viewer),
            _ => None,
        }
    }

    pub fn viewer_mut(&mut self) -> Option<&mut ViewerSession> {
        match &mut self.screen {
            Screen::Viewer(viewer) => Some(viewer),
            _ => None,
        }
    }

    /// Select a model and open the scanner for it
    pub fn pick(&mut self, id: &str) -> Result<&mut ScanSession, FlowError> {
        self.teardown();
        let record = self.catalog.select(id)?;
        info!(model = %record.id, "Opening scanner");
        self.screen = Screen::Scanner(ScanSession::new(&record.id, self.scan_settings.clone()));
        self.scan_mut().ok_or(FlowError::NoScan)
    }

    /// Advance simulated time, handing off to the viewer once detected
    pub fn tick(&mut self, dt: Duration) {
        if let Screen::Scanner(scan) = &mut self.screen {
            scan.tick(dt);
            if scan.state() == ScanState::Detected {
                self.hand_off();
            }
        }
    }

    /// Skip scanning on placeholder platforms and go straight to the viewer
    pub fn show_model(&mut self) -> Result<(), FlowError> {
        self.scan_mut().ok_or(FlowError::NoScan)?.show_model()?;
        self.hand_off();
        Ok(())
    }

    fn hand_off(&mut self) {
        let Some(record) = self.catalog.selected() else {
            warn!("Detection without a selection, returning to browser");
            self.screen = Screen::Browser;
            return;
        };
        let viewer = ViewerSession::mount(record, self.surface, self.viewer_settings.clone());
        self.screen = Screen::Viewer(viewer);
    }

    /// Leave the scanner or viewer. Returns false when already browsing.
    pub fn back(&mut self) -> bool {
        if matches!(self.screen, Screen::Browser) {
            return false;
        }
        self.teardown();
        true
    }

    fn teardown(&mut self) {
        match std::mem::replace(&mut self.screen, Screen::Browser) {
            Screen::Browser => {}
            Screen::Scanner(mut scan) => {
                scan.cancel();
                debug!(model = %scan.model_id(), "Scanner closed");
            }
            Screen::Viewer(mut viewer) => {
                viewer.unmount();
                debug!(model = %viewer.record().id, "Viewer closed");
            }
        }
        self.catalog.clear_selection();
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
        if let Some(viewer) = self.viewer_mut() {
            viewer.resize(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{CameraAccess, PermissionStatus};
    use crate::viewer::ViewerState;

    struct Granted {
        preview: bool,
    }

    impl CameraAccess for Granted {
        fn permission(&self) -> PermissionStatus {
            PermissionStatus::Granted
        }

        fn request_permission(&mut self) -> PermissionStatus {
            PermissionStatus::Granted
        }

        fn preview_available(&self) -> bool {
            self.preview
        }
    }

    fn flow() -> Flow {
        Flow::new(
            Catalog::builtin().unwrap(),
            ScanSettings::default(),
            ViewerSettings::default(),
            SurfaceSize::new(1280.0, 720.0),
        )
    }

    #[test]
    fn test_scan_timeout_mounts_viewer() {
        let mut flow = flow();
        let scan = flow.pick("heart").unwrap();
        scan.check_permission(&mut Granted { preview: true }).unwrap();
        scan.start_scan().unwrap();
        assert_eq!(flow.catalog().selected().unwrap().id, "heart");

        flow.tick(Duration::from_secs(4));
        assert_eq!(flow.screen().name(), "scanner");

        flow.tick(Duration::from_secs(1));
        let viewer = flow.viewer().unwrap();
        assert_eq!(viewer.record().id, "heart");
        assert_eq!(viewer.state(), ViewerState::Mounting);
    }

    #[test]
    fn test_back_during_scan_clears_selection() {
        let mut flow = flow();
        let scan = flow.pick("motor").unwrap();
        scan.check_permission(&mut Granted { preview: true }).unwrap();
        scan.start_scan().unwrap();
        flow.tick(Duration::from_secs(2));

        assert!(flow.back());
        assert!(flow.catalog().selected().is_none());

        flow.tick(Duration::from_secs(60));
        assert!(matches!(flow.screen(), Screen::Browser));
        assert!(!flow.back());
    }

    #[test]
    fn test_placeholder_show_model_and_back_from_viewer() {
        let mut flow = flow();
        let scan = flow.pick("earth").unwrap();
        scan.check_permission(&mut Granted { preview: false }).unwrap();
        flow.show_model().unwrap();

        let viewer = flow.viewer_mut().unwrap();
        viewer.frame().unwrap();

        assert!(flow.back());
        assert!(flow.viewer().is_none());
        assert!(flow.catalog().selected().is_none());
        assert!(matches!(flow.show_model(), Err(FlowError::NoScan)));
    }

    #[test]
    fn test_pick_replaces_live_session() {
        let mut flow = flow();
        flow.pick("motor").unwrap();
        flow.pick("rotor").unwrap();
        assert_eq!(flow.scan().unwrap().model_id(), "rotor");
        assert_eq!(flow.catalog().selected().unwrap().id, "rotor");

        assert!(matches!(flow.pick("unknown"), Err(FlowError::Catalog(_))));
        assert!(matches!(flow.screen(), Screen::Browser));
        assert!(flow.catalog().selected().is_none());
    }

    #[test]
    fn test_configured_viewer_settings_are_kept() {
        let settings = ViewerSettings {
            fov_degrees: 50.0,
            base_distance: 8.0,
            ..ViewerSettings::default()
        };
        let mut flow = Flow::new(
            Catalog::builtin().unwrap(),
            ScanSettings::default(),
            settings.clone(),
            SurfaceSize::new(1280.0, 720.0),
        );
        assert_eq!(flow.viewer_settings(), &settings);

        let scan = flow.pick("motor").unwrap();
        scan.check_permission(&mut Granted { preview: false }).unwrap();
        flow.show_model().unwrap();
        assert_eq!(flow.viewer().unwrap().camera().position(), [0.0, 0.0, 8.0]);
    }

    #[test]
    fn test_surface_resize_reaches_viewer() {
        let mut flow = flow();
        let scan = flow.pick("mars").unwrap();
        scan.check_permission(&mut Granted { preview: false }).unwrap();
        flow.show_model().unwrap();

        flow.set_surface(SurfaceSize::new(400.0, 800.0));
        assert_eq!(flow.viewer().unwrap().surface(), SurfaceSize::new(400.0, 800.0));
    }
}
