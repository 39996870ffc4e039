//! Configuration loading

use anyhow::Result;
use eduar_core::{ScanSettings, ViewerSettings, ZoomLimits};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// File that stores the theme choice
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
    /// Catalog TOML to use instead of the built-in one
    #[serde(default)]
    pub catalog_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            preferences_path: default_preferences_path(),
            catalog_path: None,
        }
    }
}

fn default_window_title() -> String {
    "EduAR".to_string()
}

fn default_preferences_path() -> String {
    "./eduar-prefs.toml".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Seconds of scanning before the marker counts as found
    #[serde(default = "default_timeout")]
    pub timeout_secs: f32,
    /// Answer given by the desktop camera when permission is requested
    #[serde(default = "default_true")]
    pub grant_camera: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            grant_camera: true,
        }
    }
}

fn default_timeout() -> f32 {
    5.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_base_distance")]
    pub base_distance: f32,
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f32,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f32,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_distance: default_base_distance(),
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            zoom_step: default_zoom_step(),
        }
    }
}

fn default_base_distance() -> f32 {
    5.0
}

fn default_fov() -> f32 {
    75.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_zoom_min() -> f32 {
    0.5
}

fn default_zoom_max() -> f32 {
    2.0
}

fn default_zoom_step() -> f32 {
    0.2
}

impl Config {
    pub fn to_scan_settings(&self) -> ScanSettings {
        let timeout = Duration::try_from_secs_f32(self.scan.timeout_secs)
            .unwrap_or_else(|_| ScanSettings::default().timeout);
        ScanSettings { timeout }
    }

    /// Viewer settings; lights keep their built-in values and invalid
    /// camera values fall back to defaults
    pub fn to_viewer_settings(&self) -> ViewerSettings {
        ViewerSettings {
            fov_degrees: self.viewer.fov_degrees,
            near: self.viewer.near,
            far: self.viewer.far,
            base_distance: self.viewer.base_distance,
            zoom: ZoomLimits {
                min: self.viewer.zoom_min,
                max: self.viewer.zoom_max,
                step: self.viewer.zoom_step,
            },
            ..ViewerSettings::default()
        }
        .validated()
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
