//! EduAR Core - Catalog, scan and viewer sessions
//!
//! Engine-agnostic state for the educational AR viewer:
//! - Model catalog with a single selection slot and category browsing
//! - Scan session gating entry into the viewer
//! - Viewer session: camera rig, render-loop snapshots, geometry load tickets
//! - Theme selection backed by a key-value preference store
//! - Navigation flow tying the pieces together

pub mod animation;
pub mod browser;
pub mod catalog;
pub mod flow;
pub mod generation;
pub mod prefs;
pub mod scan;
pub mod theme;
pub mod viewer;

pub use animation::{Animation, Axis, GroupPose};
pub use browser::Browser;
pub use catalog::{Catalog, CatalogError, Category, Label, ModelRecord};
pub use flow::{Flow, FlowError, Screen};
pub use generation::Generation;
pub use prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, PrefsError};
pub use scan::{CameraAccess, CameraFacing, PermissionStatus, ScanError, ScanSession, ScanSettings, ScanState};
pub use theme::{Palette, Rgb, ThemeMode, ThemeStore};
pub use viewer::{
    AssetLoadFailure, FrameSnapshot, LoadRequest, LoadTicket, SceneSpec, SurfaceSize, ViewerError,
    ViewerSession, ViewerSettings, ViewerState, ZoomLimits,
};
