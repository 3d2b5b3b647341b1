use crate::dock::Orientation;
use eframe::egui::{self, Color32};

pub const TILE_SIDE: f32 = 56.0;
pub const ICON_SIDE: f32 = 40.0;
pub const TILE_GAP: f32 = 6.0;
pub const PANEL_PADDING: f32 = 10.0;
pub const GRIP_SIZE: f32 = 12.0;
pub const PANEL_ROUNDING: f32 = 14.0;
pub const TILE_ROUNDING: f32 = 10.0;
pub const DROP_SHADOW: f32 = 8.0;
pub const INITIAL_TOP: f32 = 50.0;

#[derive(Clone, Copy)]
pub struct DockTheme {
    pub panel_bg: Color32,
    pub panel_border: Color32,
    pub tile_bg: Color32,
    pub tile_hover: Color32,
    pub tile_selected: Color32,
    pub tile_border: Color32,
    pub title_color: Color32,
    pub drop_hint: Color32,
    pub grip: Color32,
    pub toast_bg: Color32,
    pub toast_text: Color32,
}

impl Default for DockTheme {
    fn default() -> Self {
        Self {
            panel_bg: Color32::from_rgb(14, 20, 31),
            panel_border: Color32::from_rgba_premultiplied(161, 179, 201, 36),
            tile_bg: Color32::from_rgba_premultiplied(24, 36, 50, 154),
            tile_hover: Color32::from_rgba_premultiplied(35, 53, 74, 184),
            tile_selected: Color32::from_rgba_premultiplied(45, 104, 114, 192),
            tile_border: Color32::from_rgba_premultiplied(147, 169, 194, 78),
            title_color: Color32::from_rgb(242, 248, 255),
            drop_hint: Color32::from_rgba_premultiplied(93, 214, 189, 186),
            grip: Color32::from_rgba_premultiplied(205, 221, 238, 108),
            toast_bg: Color32::from_rgba_premultiplied(8, 12, 18, 236),
            toast_text: Color32::from_rgb(245, 250, 255),
        }
    }
}

impl DockTheme {
    /// Panel background at the user's opacity. Tiles stay opaque.
    pub fn panel_fill(&self, opacity_percent: f32) -> Color32 {
        let alpha = (opacity_percent.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8;
        let [r, g, b, _] = self.panel_bg.to_array();
        Color32::from_rgba_unmultiplied(r, g, b, alpha)
    }
}

/// Window size that fits `tiles` drawn slots plus the resize grip.
pub fn panel_size(tiles: usize, orientation: Orientation, scale: f32) -> egui::Vec2 {
    let n = tiles.max(1) as f32;
    let main = PANEL_PADDING * 2.0 + n * TILE_SIDE + (n - 1.0) * TILE_GAP + GRIP_SIZE;
    let cross = PANEL_PADDING * 2.0 + TILE_SIDE;
    match orientation {
        Orientation::Horizontal => egui::vec2(main, cross) * scale,
        Orientation::Vertical => egui::vec2(cross, main) * scale,
    }
}

/// Rect of drawn slot `index` inside a panel whose top-left is `origin`.
pub fn tile_rect(
    origin: egui::Pos2,
    index: usize,
    orientation: Orientation,
    scale: f32,
) -> egui::Rect {
    let step = (TILE_SIDE + TILE_GAP) * index as f32;
    let offset = match orientation {
        Orientation::Horizontal => egui::vec2(PANEL_PADDING + step, PANEL_PADDING),
        Orientation::Vertical => egui::vec2(PANEL_PADDING, PANEL_PADDING + step),
    };
    egui::Rect::from_min_size(
        origin + offset * scale,
        egui::Vec2::splat(TILE_SIDE * scale),
    )
}

/// Without a saved position the window sits centred at the top of the
/// monitor.
pub fn initial_position(monitor: egui::Vec2, window: egui::Vec2) -> egui::Pos2 {
    egui::pos2(((monitor.x - window.x) / 2.0).max(0.0), INITIAL_TOP)
}

pub fn style_compact_menu(ui: &mut egui::Ui) {
    let visuals = ui.visuals_mut();
    visuals.window_fill = Color32::from_rgba_premultiplied(246, 248, 252, 252);
    visuals.panel_fill = Color32::from_rgba_premultiplied(246, 248, 252, 252);
    visuals.extreme_bg_color = Color32::from_rgba_premultiplied(238, 243, 250, 255);
    visuals.widgets.noninteractive.bg_fill = Color32::TRANSPARENT;
    visuals.widgets.noninteractive.fg_stroke.color = Color32::from_rgb(10, 16, 24);
    visuals.widgets.inactive.bg_fill = Color32::TRANSPARENT;
    visuals.widgets.inactive.fg_stroke.color = Color32::from_rgb(10, 16, 24);
    visuals.widgets.hovered.bg_fill = Color32::from_rgba_premultiplied(205, 225, 242, 230);
    visuals.widgets.hovered.fg_stroke.color = Color32::from_rgb(5, 10, 18);
    visuals.widgets.active.bg_fill = Color32::from_rgba_premultiplied(188, 214, 235, 245);
    visuals.widgets.active.fg_stroke.color = Color32::from_rgb(5, 10, 18);
    visuals.window_stroke.color = Color32::from_rgba_premultiplied(126, 146, 171, 210);
    visuals.popup_shadow.color = Color32::from_rgba_premultiplied(0, 0, 0, 42);

    let style = ui.style_mut();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 7.0);
}
