//! Theme selection and colour tokens
//!
//! The chosen mode is persisted under a single preference key. `System`
//! follows the platform's dark-mode flag, which callers pass in.

use tracing::{info, warn};

use crate::prefs::PreferenceStore;

/// Preference key holding the theme mode
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            "system" => Some(ThemeMode::System),
            _ => None,
        }
    }
}

/// sRGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn hex(value: u32) -> Self {
        Self((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

/// Colour tokens used across all screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub text: Rgb,
    pub primary_text: Rgb,
    pub secondary_text: Rgb,
    pub card: Rgb,
    pub primary: Rgb,
    pub secondary: Rgb,
    pub accent: Rgb,
    pub border: Rgb,
    pub error: Rgb,
    pub success: Rgb,
    pub tab_bar: Rgb,
    pub tab_bar_inactive: Rgb,
}

pub const LIGHT_PALETTE: Palette = Palette {
    background: Rgb::hex(0xF9FAFB),
    text: Rgb::hex(0x1F2937),
    primary_text: Rgb::hex(0x111827),
    secondary_text: Rgb::hex(0x4B5563),
    card: Rgb::hex(0xFFFFFF),
    primary: Rgb::hex(0x3B82F6),
    secondary: Rgb::hex(0x8B5CF6),
    accent: Rgb::hex(0xF59E0B),
    border: Rgb::hex(0xE5E7EB),
    error: Rgb::hex(0xEF4444),
    success: Rgb::hex(0x10B981),
    tab_bar: Rgb::hex(0xFFFFFF),
    tab_bar_inactive: Rgb::hex(0x9CA3AF),
};

pub const DARK_PALETTE: Palette = Palette {
    background: Rgb::hex(0x111827),
    text: Rgb::hex(0xF9FAFB),
    primary_text: Rgb::hex(0xF3F4F6),
    secondary_text: Rgb::hex(0xD1D5DB),
    card: Rgb::hex(0x1F2937),
    primary: Rgb::hex(0x60A5FA),
    secondary: Rgb::hex(0xA78BFA),
    accent: Rgb::hex(0xFBBF24),
    border: Rgb::hex(0x374151),
    error: Rgb::hex(0xF87171),
    success: Rgb::hex(0x34D399),
    tab_bar: Rgb::hex(0x1F2937),
    tab_bar_inactive: Rgb::hex(0x6B7280),
};

/// Owns the current theme mode and its backing store
pub struct ThemeStore {
    mode: ThemeMode,
    store: Box<dyn PreferenceStore>,
}

impl ThemeStore {
    /// Read the persisted mode. Missing, unreadable or unknown values mean `System`.
    pub fn load(store: Box<dyn PreferenceStore>) -> Self {
        let mode = match store.get(THEME_KEY) {
            Ok(Some(value)) => ThemeMode::from_key(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown stored theme, using system");
                ThemeMode::System
            }),
            Ok(None) => ThemeMode::System,
            Err(e) => {
                warn!(error = %e, "Failed to load theme");
                ThemeMode::System
            }
        };
        Self { mode, store }
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    /// Change the mode. Persisting is best effort; the new mode applies either way.
    pub fn set_mode(&mut self, mode: ThemeMode) {
        self.mode = mode;
        match self.store.set(THEME_KEY, mode.as_str()) {
            Ok(()) => info!(theme = mode.as_str(), "Theme changed"),
            Err(e) => warn!(error = %e, "Failed to save theme"),
        }
    }

    pub fn is_dark(&self, system_dark: bool) -> bool {
        match self.mode {
            ThemeMode::System => system_dark,
            ThemeMode::Dark => true,
            ThemeMode::Light => false,
        }
    }

    pub fn palette(&self, system_dark: bool) -> &'static Palette {
        if self.is_dark(system_dark) {
            &DARK_PALETTE
        } else {
            &LIGHT_PALETTE
        }
    }

    /// Flip between explicit light and dark
    pub fn toggle(&mut self, system_dark: bool) {
        let next = if self.is_dark(system_dark) {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        };
        self.set_mode(next);
    }
}

impl std::fmt::Debug for ThemeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeStore").field("mode", &self.mode).finish()
    }
}
