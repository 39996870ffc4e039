//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowTheme, WindowThemeChanged};
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use eduar_core::theme::Palette;
use eduar_core::{
    CameraFacing, Flow, ModelRecord, Rgb, ScanSession, ScanState, Screen, ThemeMode, ThemeStore,
    ViewerSession, ViewerState,
};
use eduar_scene::ArFlow;
use tracing::warn;

use crate::camera_access::DesktopCamera;

/// Theme choice plus the OS preference it may defer to
#[derive(Resource, Debug)]
pub struct ThemeState {
    pub store: ThemeStore,
    pub system_dark: bool,
    /// Darkness of the visuals last pushed to egui
    applied: Option<bool>,
}

impl ThemeState {
    pub fn new(store: ThemeStore) -> Self {
        Self {
            store,
            system_dark: false,
            applied: None,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.store.is_dark(self.system_dark)
    }

    pub fn palette(&self) -> &'static Palette {
        self.store.palette(self.system_dark)
    }
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, init_system_theme)
            .add_systems(Update, (track_system_theme, resolve_permission))
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Something the user asked for this frame
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SelectCategory(String),
    Pick(String),
    Back,
    Retry,
    StartScan,
    ShowModel,
    ToggleFacing,
    ZoomIn,
    ZoomOut,
    ResetView,
    SetTheme(ThemeMode),
    ToggleTheme,
}

/// Seed the OS preference from the primary window; later changes arrive as messages
fn init_system_theme(windows: Query<&Window, With<PrimaryWindow>>, mut theme: ResMut<ThemeState>) {
    let Ok(window) = windows.single() else { return };
    if let Some(window_theme) = window.window_theme {
        theme.system_dark = window_theme == WindowTheme::Dark;
    }
}

fn track_system_theme(mut changes: MessageReader<WindowThemeChanged>, mut theme: ResMut<ThemeState>) {
    for change in changes.read() {
        theme.system_dark = change.theme == WindowTheme::Dark;
    }
}

/// Ask for camera access as soon as a scanner opens
fn resolve_permission(mut flow: ResMut<ArFlow>, mut camera: ResMut<DesktopCamera>) {
    let Some(scan) = flow.scan_mut() else { return };
    if scan.state() != ScanState::AwaitingPermission {
        return;
    }
    if let Err(e) = scan.check_permission(&mut *camera) {
        warn!(error = %e, "Permission check failed");
    }
}

/// Apply one user action to the flow
pub fn apply_action(
    action: UiAction,
    flow: &mut Flow,
    camera: &mut DesktopCamera,
    theme: &mut ThemeState,
) {
    match action {
        UiAction::SelectCategory(id) => flow.browser_mut().set_category(&id),
        UiAction::Pick(id) => {
            if let Err(e) = flow.pick(&id) {
                warn!(model = %id, error = %e, "Cannot open model");
            }
        }
        UiAction::Back => {
            flow.back();
        }
        UiAction::Retry => {
            if let Some(scan) = flow.scan_mut() {
                if let Err(e) = scan.retry(camera) {
                    warn!(error = %e, "Retry rejected");
                }
            }
        }
        UiAction::StartScan => {
            if let Some(scan) = flow.scan_mut() {
                if let Err(e) = scan.start_scan() {
                    warn!(error = %e, "Scan not started");
                }
            }
        }
        UiAction::ShowModel => {
            if let Err(e) = flow.show_model() {
                warn!(error = %e, "Show model rejected");
            }
        }
        UiAction::ToggleFacing => {
            if let Some(scan) = flow.scan_mut() {
                scan.toggle_facing();
            }
        }
        UiAction::ZoomIn | UiAction::ZoomOut | UiAction::ResetView => {
            let Some(viewer) = flow.viewer_mut() else { return };
            let result = match action {
                UiAction::ZoomIn => viewer.zoom_in().map(|_| ()),
                UiAction::ZoomOut => viewer.zoom_out().map(|_| ()),
                _ => viewer.reset(),
            };
            if let Err(e) = result {
                warn!(error = %e, "Camera control ignored");
            }
        }
        UiAction::SetTheme(mode) => theme.store.set_mode(mode),
        UiAction::ToggleTheme => {
            let system_dark = theme.system_dark;
            theme.store.toggle(system_dark);
        }
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    mut flow: ResMut<ArFlow>,
    mut theme: ResMut<ThemeState>,
    mut camera: ResMut<DesktopCamera>,
    mut settings_open: Local<bool>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let dark = theme.is_dark();
    let palette = *theme.palette();
    if theme.applied != Some(dark) {
        ctx.set_visuals(visuals(&palette, dark));
        theme.applied = Some(dark);
    }

    let mut actions = Vec::new();
    match flow.screen() {
        Screen::Browser => {
            browser_screen(ctx, &flow.0, &palette, &mut settings_open, &mut actions);
            if *settings_open {
                settings_window(ctx, &theme, &mut settings_open, &mut actions);
            }
        }
        Screen::Scanner(scan) => {
            let record = flow.catalog().get(scan.model_id());
            scanner_screen(ctx, scan, record, &palette, &mut actions);
        }
        Screen::Viewer(viewer) => viewer_screen(ctx, viewer, &palette, &mut actions),
    }

    for action in actions {
        apply_action(action, &mut flow.0, &mut camera, &mut theme);
    }
}

fn color(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

/// egui visuals built from the palette tokens
pub fn visuals(palette: &Palette, dark: bool) -> egui::Visuals {
    let mut visuals = if dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    visuals.panel_fill = color(palette.background);
    visuals.window_fill = color(palette.card);
    visuals.extreme_bg_color = color(palette.card);
    visuals.override_text_color = Some(color(palette.text));
    visuals.hyperlink_color = color(palette.primary);
    visuals.selection.bg_fill = color(palette.primary);
    visuals.error_fg_color = color(palette.error);
    visuals.widgets.noninteractive.bg_stroke.color = color(palette.border);
    visuals
}

fn header(
    ui: &mut egui::Ui,
    title: &str,
    palette: &Palette,
    actions: &mut Vec<UiAction>,
) {
    ui.horizontal(|ui| {
        if ui
            .button(egui::RichText::new("< Back").color(color(palette.primary)))
            .clicked()
        {
            actions.push(UiAction::Back);
        }
        ui.heading(egui::RichText::new(title).color(color(palette.primary_text)));
    });
}

fn browser_screen(
    ctx: &egui::Context,
    flow: &Flow,
    palette: &Palette,
    settings_open: &mut bool,
    actions: &mut Vec<UiAction>,
) {
    let catalog = flow.catalog();
    let browser = flow.browser();

    egui::TopBottomPanel::top("browser_header").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("EduAR").color(color(palette.primary_text)));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Settings").clicked() {
                    *settings_open = !*settings_open;
                }
            });
        });

        ui.horizontal_wrapped(|ui| {
            for category in catalog.categories() {
                let active = category.id == browser.active_category();
                if ui.selectable_label(active, &category.title).clicked() && !active {
                    actions.push(UiAction::SelectCategory(category.id.clone()));
                }
            }
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        if let Some(category) = catalog.category(browser.active_category()) {
            ui.label(
                egui::RichText::new(&category.description).color(color(palette.secondary_text)),
            );
            ui.add_space(8.0);
        }

        let planets = browser.planet_entries(catalog);
        if !planets.is_empty() {
            ui.label(
                egui::RichText::new("Explore Our Solar System")
                    .strong()
                    .color(color(palette.primary_text)),
            );
            egui::ScrollArea::horizontal()
                .id_salt("planet_strip")
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        for planet in &planets {
                            if ui.button(&planet.name).clicked() {
                                actions.push(UiAction::Pick(planet.id.clone()));
                            }
                        }
                    });
                });
            ui.add_space(8.0);
        }

        let entries = browser.main_entries(catalog);
        if entries.is_empty() {
            ui.label("No models in this category");
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for record in entries {
                model_card(ui, record, palette, actions);
                ui.add_space(6.0);
            }
        });
    });
}

fn model_card(
    ui: &mut egui::Ui,
    record: &ModelRecord,
    palette: &Palette,
    actions: &mut Vec<UiAction>,
) {
    egui::Frame::group(ui.style())
        .fill(color(palette.card))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(
                        egui::RichText::new(&record.name)
                            .strong()
                            .size(16.0)
                            .color(color(palette.primary_text)),
                    );
                    ui.label(
                        egui::RichText::new(&record.description).color(color(palette.secondary_text)),
                    );
                    if !record.labels.is_empty() {
                        ui.label(
                            egui::RichText::new(format!("{} labelled parts", record.labels.len()))
                                .small()
                                .color(color(palette.accent)),
                        );
                    }
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Scan").clicked() {
                        actions.push(UiAction::Pick(record.id.clone()));
                    }
                });
            });
        });
}

fn settings_window(
    ctx: &egui::Context,
    theme: &ThemeState,
    open: &mut bool,
    actions: &mut Vec<UiAction>,
) {
    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .open(open)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label("Appearance");
            ui.horizontal(|ui| {
                for mode in [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System] {
                    let label = match mode {
                        ThemeMode::Light => "Light",
                        ThemeMode::Dark => "Dark",
                        ThemeMode::System => "System",
                    };
                    if ui.selectable_label(theme.store.mode() == mode, label).clicked() {
                        actions.push(UiAction::SetTheme(mode));
                    }
                }
            });

            let mut dark = theme.is_dark();
            if ui.checkbox(&mut dark, "Dark mode").changed() {
                actions.push(UiAction::ToggleTheme);
            }
        });
}

fn scanner_screen(
    ctx: &egui::Context,
    scan: &ScanSession,
    record: Option<&ModelRecord>,
    palette: &Palette,
    actions: &mut Vec<UiAction>,
) {
    let title = record.map(|r| r.name.as_str()).unwrap_or(scan.model_id());

    egui::TopBottomPanel::top("scanner_header").show(ctx, |ui| {
        header(ui, title, palette, actions);
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            match scan.state() {
                ScanState::AwaitingPermission => {
                    ui.label("Loading camera...");
                }
                ScanState::PermissionDenied => {
                    ui.label("We need your permission to use the camera");
                    ui.add_space(12.0);
                    if ui.button("Grant Permission").clicked() {
                        actions.push(UiAction::Retry);
                    }
                }
                ScanState::Idle if scan.is_placeholder() => {
                    ui.label("Camera preview not available on this device.");
                    ui.add_space(24.0);
                    if ui.button("Show 3D Model").clicked() {
                        actions.push(UiAction::ShowModel);
                    }
                }
                ScanState::Idle => {
                    ui.label("Point your camera at the marker");
                    ui.add_space(12.0);
                    ui.horizontal(|ui| {
                        if ui.button("Start Scanning").clicked() {
                            actions.push(UiAction::StartScan);
                        }
                        let facing = match scan.facing() {
                            CameraFacing::Back => "Back camera",
                            CameraFacing::Front => "Front camera",
                        };
                        if ui.button(facing).clicked() {
                            actions.push(UiAction::ToggleFacing);
                        }
                    });
                }
                ScanState::Scanning => {
                    ui.spinner();
                    ui.label(egui::RichText::new("Scanning...").color(color(palette.primary)));
                    if let Some(remaining) = scan.remaining() {
                        ui.label(
                            egui::RichText::new(format!("{:.1}s", remaining.as_secs_f32()))
                                .small()
                                .color(color(palette.secondary_text)),
                        );
                    }
                }
                ScanState::Detected | ScanState::Cancelled => {}
            }
        });
    });
}

fn viewer_screen(
    ctx: &egui::Context,
    viewer: &ViewerSession,
    palette: &Palette,
    actions: &mut Vec<UiAction>,
) {
    let record = viewer.record();

    egui::TopBottomPanel::top("viewer_header").show(ctx, |ui| {
        header(ui, &record.name, palette, actions);
    });

    match viewer.state() {
        ViewerState::Error | ViewerState::Unmounted => {
            let message = viewer
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Viewer closed".to_string());
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(48.0);
                    ui.label(egui::RichText::new(message).color(color(palette.error)));
                });
            });
            return;
        }
        ViewerState::Mounting => {
            centered_note(ctx, "Loading 3D model...", color(palette.text));
        }
        ViewerState::Ready => {
            if let Some(failure) = viewer.load_failure() {
                centered_note(ctx, &failure.to_string(), color(palette.error));
            }
        }
    }

    egui::TopBottomPanel::bottom("viewer_controls").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button(" - ").clicked() {
                actions.push(UiAction::ZoomOut);
            }
            if ui.button("Reset").clicked() {
                actions.push(UiAction::ResetView);
            }
            if ui.button(" + ").clicked() {
                actions.push(UiAction::ZoomIn);
            }
            ui.label(
                egui::RichText::new(format!("{:.0}%", viewer.camera().zoom() * 100.0))
                    .color(color(palette.secondary_text)),
            );
        });
    });

    if !record.labels.is_empty() {
        egui::SidePanel::right("component_labels")
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("Component Labels")
                        .strong()
                        .color(color(palette.primary_text)),
                );
                for label in &record.labels {
                    ui.label(&label.name);
                }
            });
    }

    // Anchor markers over the rendered model
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("label_anchors"),
    ));
    for label in viewer.project_labels() {
        let Some([x, y]) = label.screen else { continue };
        let anchor = egui::pos2(x, y);
        painter.circle_filled(anchor, 3.0, color(palette.accent));
        painter.text(
            anchor + egui::vec2(6.0, 0.0),
            egui::Align2::LEFT_CENTER,
            &label.name,
            egui::FontId::proportional(12.0),
            color(palette.text),
        );
    }
}

fn centered_note(ctx: &egui::Context, text: &str, text_color: egui::Color32) {
    egui::Area::new(egui::Id::new("viewer_note"))
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(text).size(16.0).color(text_color));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduar_core::theme::{DARK_PALETTE, LIGHT_PALETTE};
    use eduar_core::{
        Catalog, MemoryPreferenceStore, ScanSettings, SurfaceSize, ViewerSettings,
    };

    fn fixture() -> (Flow, DesktopCamera, ThemeState) {
        let flow = Flow::new(
            Catalog::builtin().unwrap(),
            ScanSettings::default(),
            ViewerSettings::default(),
            SurfaceSize::new(1280.0, 720.0),
        );
        let theme = ThemeState::new(ThemeStore::load(Box::new(MemoryPreferenceStore::new())));
        (flow, DesktopCamera::new(true), theme)
    }

    fn theme_app(window_theme: Option<WindowTheme>) -> App {
        let (_, _, theme) = fixture();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(theme)
            .add_systems(Startup, init_system_theme);
        app.world_mut().spawn((
            Window {
                window_theme,
                ..default()
            },
            PrimaryWindow,
        ));
        app
    }

    #[test]
    fn test_dark_window_seeds_system_theme() {
        let mut app = theme_app(Some(WindowTheme::Dark));
        app.update();

        let theme = app.world().resource::<ThemeState>();
        assert!(theme.system_dark);
        assert_eq!(theme.store.mode(), ThemeMode::System);
        assert!(theme.is_dark());
    }

    #[test]
    fn test_unknown_window_theme_keeps_light() {
        let mut app = theme_app(None);
        app.update();
        assert!(!app.world().resource::<ThemeState>().system_dark);
    }

    #[test]
    fn test_pick_and_show_model_reaches_viewer() {
        let (mut flow, mut camera, mut theme) = fixture();
        apply_action(UiAction::Pick("brain".into()), &mut flow, &mut camera, &mut theme);

        let scan = flow.scan_mut().unwrap();
        scan.check_permission(&mut camera).unwrap();
        apply_action(UiAction::ShowModel, &mut flow, &mut camera, &mut theme);
        assert_eq!(flow.viewer().unwrap().record().id, "brain");

        apply_action(UiAction::ZoomIn, &mut flow, &mut camera, &mut theme);
        assert!((flow.viewer().unwrap().camera().zoom() - 1.2).abs() < 1e-6);
        apply_action(UiAction::ResetView, &mut flow, &mut camera, &mut theme);
        assert_eq!(flow.viewer().unwrap().camera().zoom(), 1.0);

        apply_action(UiAction::Back, &mut flow, &mut camera, &mut theme);
        assert!(matches!(flow.screen(), Screen::Browser));
        assert!(flow.catalog().selected().is_none());
    }

    #[test]
    fn test_rejected_actions_leave_flow_alone() {
        let (mut flow, mut camera, mut theme) = fixture();
        apply_action(UiAction::ShowModel, &mut flow, &mut camera, &mut theme);
        apply_action(UiAction::ZoomIn, &mut flow, &mut camera, &mut theme);
        apply_action(UiAction::Pick("missing".into()), &mut flow, &mut camera, &mut theme);
        assert!(matches!(flow.screen(), Screen::Browser));

        apply_action(UiAction::Pick("motor".into()), &mut flow, &mut camera, &mut theme);
        apply_action(UiAction::StartScan, &mut flow, &mut camera, &mut theme);
        assert_eq!(flow.scan().unwrap().state(), ScanState::AwaitingPermission);
    }

    #[test]
    fn test_category_and_theme_actions() {
        let (mut flow, mut camera, mut theme) = fixture();
        apply_action(UiAction::SelectCategory("school".into()), &mut flow, &mut camera, &mut theme);
        assert_eq!(flow.browser().active_category(), "school");

        assert_eq!(theme.palette(), &LIGHT_PALETTE);
        apply_action(UiAction::ToggleTheme, &mut flow, &mut camera, &mut theme);
        assert_eq!(theme.store.mode(), ThemeMode::Dark);
        assert_eq!(theme.palette(), &DARK_PALETTE);

        apply_action(UiAction::SetTheme(ThemeMode::System), &mut flow, &mut camera, &mut theme);
        theme.system_dark = true;
        assert!(theme.is_dark());
    }

    #[test]
    fn test_visuals_use_palette_tokens() {
        let visuals = visuals(&DARK_PALETTE, true);
        assert!(visuals.dark_mode);
        assert_eq!(visuals.panel_fill, color(DARK_PALETTE.background));
        assert_eq!(visuals.override_text_color, Some(color(DARK_PALETTE.text)));
    }
}
