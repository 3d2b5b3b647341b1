#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

mod app;
mod branding;
mod config;
mod dock;
mod icons;
mod logging;
mod system;

use crate::app::{panel_size, DockApp};
use crate::branding::APP_DISPLAY_NAME;
use crate::config::{AppPaths, JsonConfigStore};
use crate::dock::Dock;
use crate::icons::ShellIconResolver;
use crate::system::ShellLauncher;
use eframe::egui;
use log::{info, warn};

fn main() -> eframe::Result<()> {
    logging::init(logging::debug_requested());

    let paths = AppPaths::discover().unwrap_or_else(|| {
        let fallback = std::env::temp_dir().join(branding::APP_CONFIG_APPLICATION);
        warn!(
            "no config directory available, using {}",
            fallback.display()
        );
        AppPaths::under(&fallback)
    });
    let config_store = JsonConfigStore::at(paths.config_file.clone());
    info!("config file: {}", config_store.path().display());

    let dock = Dock::hydrate(
        Box::new(config_store),
        Box::new(ShellLauncher),
        Box::new(ShellIconResolver::new(Some(paths.icon_cache_dir.clone()))),
        Some(paths.shortcuts_dir.clone()),
    );

    let prefs = *dock.preferences();
    let size = panel_size(
        dock.store().len(),
        prefs.orientation,
        prefs.scale_factor(),
    );
    let mut viewport = egui::ViewportBuilder::default()
        .with_title(APP_DISPLAY_NAME)
        .with_inner_size(size)
        .with_resizable(false)
        .with_decorations(false)
        .with_transparent(true)
        .with_always_on_top()
        .with_taskbar(false)
        .with_drag_and_drop(true)
        .with_visible(true);
    if let Some(pos) = prefs.window_pos {
        viewport = viewport.with_position(pos);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        APP_DISPLAY_NAME,
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            install_windows_font_fallback(&cc.egui_ctx);
            Ok(Box::new(DockApp::new(cc, dock)))
        }),
    )
}

/// Tile names can be CJK; the bundled fonts have no such glyphs.
fn install_windows_font_fallback(ctx: &egui::Context) {
    if !cfg!(windows) {
        return;
    }
    let mut fonts = egui::FontDefinitions::default();
    let font_candidates = [
        ("yahei", r"C:\Windows\Fonts\msyh.ttc"),
        ("simhei", r"C:\Windows\Fonts\simhei.ttf"),
    ];

    for (name, path) in font_candidates {
        if let Ok(data) = std::fs::read(path) {
            fonts
                .font_data
                .insert(name.to_owned(), egui::FontData::from_owned(data).into());
            if let Some(family) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
                family.push(name.to_owned());
            }
            ctx.set_fonts(fonts);
            return;
        }
    }
}
