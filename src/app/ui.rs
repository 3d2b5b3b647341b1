use super::state::{FileRoute, ScaleGrip, WindowDrag};
use super::style::{
    initial_position, panel_size, style_compact_menu, tile_rect, DockTheme, DROP_SHADOW,
    GRIP_SIZE, ICON_SIDE, PANEL_ROUNDING, TILE_ROUNDING,
};
use super::DockApp;
use crate::config::{PanelPreferences, DEFAULT_SCALE};
use crate::dock::ingest::IngestError;
use crate::dock::session::{Commit, DragPhase, DIMMED_TILE_OPACITY};
use crate::dock::{Orientation, SessionOutcome, ShortcutId, TileLayout, VisualSlot};
use eframe::egui;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

const TOAST_DURATION: Duration = Duration::from_secs(2);

enum TileAction {
    Launch(ShortcutId),
    Reveal(ShortcutId),
    Remove(ShortcutId),
}

enum PanelAction {
    Orientation(Orientation),
    Opacity(f32),
    ResetScale,
    Close,
}

/// What one drawn frame produced for the event routing that follows it.
struct PanelFrame {
    bounds: Vec<Option<egui::Rect>>,
    pressed: Option<(usize, egui::Pos2)>,
    panel_rect: egui::Rect,
    background_drag_started: bool,
    grip_drag_started: bool,
    tile_actions: Vec<TileAction>,
    panel_actions: Vec<PanelAction>,
}

impl PanelFrame {
    fn new(panel_rect: egui::Rect) -> Self {
        Self {
            bounds: Vec::new(),
            pressed: None,
            panel_rect,
            background_drag_started: false,
            grip_drag_started: false,
            tile_actions: Vec::new(),
            panel_actions: Vec::new(),
        }
    }
}

impl eframe::App for DockApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_after_store_change();
        self.handle_interruptions(ctx);

        let prefs = self.effective_prefs();
        let size = panel_size(
            self.dock.store().visual_len(),
            prefs.orientation,
            prefs.scale_factor(),
        );
        self.sync_window_geometry(ctx, size);

        let frame = self.draw_panel(ctx, &prefs);
        self.route_pointer(ctx, &frame, &prefs);
        self.route_files(ctx, &frame, &prefs);
        self.begin_window_gestures(ctx, &frame, &prefs);
        self.update_window_drag(ctx);
        self.update_scale_grip(ctx);
        self.apply_actions(ctx, frame.tile_actions, frame.panel_actions);

        self.draw_ghost(ctx, &prefs);
        self.draw_warning_overlay(ctx);
    }
}

impl DockApp {
    fn handle_interruptions(&mut self, ctx: &egui::Context) {
        let (escape, focused) =
            ctx.input(|i| (i.key_pressed(egui::Key::Escape), i.viewport().focused));
        let busy = !matches!(self.dock.session().phase(), DragPhase::Idle);
        if escape && busy {
            info!("drag cancelled by Escape");
            self.dock.cancel_drag();
            self.file_hover.cancel();
        } else if focused == Some(false) && self.dock.session().dragged().is_some() {
            info!("drag cancelled by focus loss");
            self.dock.cancel_drag();
        }
    }

    fn sync_window_geometry(&mut self, ctx: &egui::Context, size: egui::Vec2) {
        if self.last_size != Some(size) {
            self.last_size = Some(size);
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
        }
        if !self.placed {
            if let Some(monitor) = ctx.input(|i| i.viewport().monitor_size) {
                self.placed = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(initial_position(
                    monitor, size,
                )));
            }
        }
    }

    fn draw_panel(&mut self, ctx: &egui::Context, prefs: &PanelPreferences) -> PanelFrame {
        let theme = DockTheme::default();
        let scale = prefs.scale_factor();
        let orientation = prefs.orientation;
        let dragged = self.dock.session().dragged();
        let busy = !matches!(self.dock.session().phase(), DragPhase::Idle);
        let pressed_now = ctx.input(|i| i.pointer.primary_pressed());
        let press_origin = ctx.input(|i| i.pointer.press_origin());
        let grip_held = self.scale_grip.is_some();

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let response =
                    ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
                let mut frame = PanelFrame::new(response.rect);

                ui.painter().rect_filled(
                    response.rect,
                    PANEL_ROUNDING * scale,
                    theme.panel_fill(prefs.opacity_percent),
                );
                ui.painter().rect_stroke(
                    response.rect,
                    PANEL_ROUNDING * scale,
                    egui::Stroke::new(1.0, theme.panel_border),
                );

                let slots = self.dock.store().visual_slots();
                if slots.is_empty() {
                    let hint = tile_rect(response.rect.min, 0, orientation, scale);
                    ui.painter().rect_stroke(
                        hint,
                        TILE_ROUNDING * scale,
                        egui::Stroke::new(1.0, theme.drop_hint),
                    );
                    ui.painter().text(
                        hint.center(),
                        egui::Align2::CENTER_CENTER,
                        "Drop here",
                        egui::FontId::proportional(10.0 * scale),
                        theme.title_color,
                    );
                }

                for (visual, slot) in slots.iter().enumerate() {
                    let rect = tile_rect(response.rect.min, visual, orientation, scale);
                    frame.bounds.push(Some(rect));

                    let (index, item) = match slot {
                        VisualSlot::Placeholder => {
                            ui.painter().rect_stroke(
                                rect.shrink(2.0),
                                TILE_ROUNDING * scale,
                                egui::Stroke::new(1.5, theme.drop_hint),
                            );
                            continue;
                        }
                        VisualSlot::Tile(index, item) => (*index, *item),
                    };

                    let id = item.id();
                    let resp = ui.interact(
                        rect,
                        ui.make_persistent_id(("tile", id)),
                        egui::Sense::click_and_drag(),
                    );
                    if pressed_now && resp.hovered() {
                        if let Some(origin) = press_origin {
                            frame.pressed = Some((index, origin));
                        }
                    }

                    let selected = self.selected == Some(id);
                    let fill = if selected {
                        theme.tile_selected
                    } else if resp.hovered() && !busy {
                        theme.tile_hover
                    } else {
                        theme.tile_bg
                    };
                    let opacity = if dragged == Some(id) {
                        DIMMED_TILE_OPACITY
                    } else {
                        1.0
                    };
                    let texture = self.textures.get_or_load(ctx, item);
                    paint_tile(
                        ui.painter(),
                        rect,
                        texture,
                        fill,
                        (selected || resp.hovered()).then_some(theme.tile_border),
                        opacity,
                        scale,
                        &theme,
                    );

                    let resp = if busy {
                        resp
                    } else {
                        resp.on_hover_text(format!("{}\n{}", item.name, item.path.display()))
                    };
                    resp.context_menu(|ui| {
                        style_compact_menu(ui);
                        if ui.button("Launch").clicked() {
                            frame.tile_actions.push(TileAction::Launch(id));
                            ui.close_menu();
                        }
                        if ui.button("Open file location").clicked() {
                            frame.tile_actions.push(TileAction::Reveal(id));
                            ui.close_menu();
                        }
                        ui.separator();
                        if ui.button("Remove").clicked() {
                            frame.tile_actions.push(TileAction::Remove(id));
                            ui.close_menu();
                        }
                    });
                }

                let grip_rect = egui::Rect::from_min_max(
                    response.rect.max - egui::Vec2::splat(GRIP_SIZE * scale),
                    response.rect.max,
                );
                frame.grip_drag_started = draw_scale_grip(ui, grip_rect, &theme, grip_held);
                frame.background_drag_started =
                    response.drag_started_by(egui::PointerButton::Primary);

                response.context_menu(|ui| {
                    draw_panel_menu(ui, prefs, &mut frame.panel_actions);
                });

                frame
            })
            .inner
    }

    fn route_pointer(&mut self, ctx: &egui::Context, frame: &PanelFrame, prefs: &PanelPreferences) {
        let layout = TileLayout::new(prefs.orientation, &frame.bounds);
        if let Some((index, origin)) = frame.pressed {
            self.dock.pointer_down(index, origin);
        }

        let (latest, released) =
            ctx.input(|i| (i.pointer.latest_pos(), i.pointer.primary_released()));
        let tile_gesture = matches!(
            self.dock.session().phase(),
            DragPhase::Armed { .. }
        ) || self.dock.session().dragged().is_some();
        if !tile_gesture {
            return;
        }

        if let Some(pos) = latest {
            self.dock.pointer_move(pos, layout);
            ctx.request_repaint();
        }

        if released {
            let inside = pointer_inside(ctx, frame.panel_rect);
            match self.dock.pointer_up(inside, layout) {
                Ok(SessionOutcome::Launch(id))
                | Ok(SessionOutcome::Committed(Commit::Moved { id, .. })) => {
                    self.selected = Some(id);
                }
                Ok(_) => {}
                Err(err) => self.show_warning(err.to_string()),
            }
        }
    }

    fn route_files(&mut self, ctx: &egui::Context, frame: &PanelFrame, prefs: &PanelPreferences) {
        let layout = TileLayout::new(prefs.orientation, &frame.bounds);
        let (any_hovered, hovered, dropped) = ctx.input(|i| {
            let hovered: Vec<PathBuf> = i
                .raw
                .hovered_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect();
            let dropped: Vec<PathBuf> = i
                .raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect();
            (!i.raw.hovered_files.is_empty(), hovered, dropped)
        });
        let pointer = pointer_inside(ctx, frame.panel_rect);

        match self.file_hover.route(any_hovered, !dropped.is_empty()) {
            FileRoute::Drop => {
                    let outcome = self.dock.files_dropped(&dropped, pointer, layout);
                if let SessionOutcome::Committed(Commit::Inserted(report)) = outcome {
                    if let Some(id) = report.added.last() {
                        self.selected = Some(*id);
                    }
                    if let Some(message) = rejection_message(&report.rejected) {
                        self.show_warning(message);
                    }
                }
            }
            FileRoute::Hover => {
                self.dock.files_hovered(hovered, pointer, layout);
                ctx.request_repaint();
            }
            FileRoute::Leave => {
                self.dock.files_left();
            }
            FileRoute::Ignore => {}
        }
    }

    fn begin_window_gestures(
        &mut self,
        ctx: &egui::Context,
        frame: &PanelFrame,
        prefs: &PanelPreferences,
    ) {
        let idle = matches!(self.dock.session().phase(), DragPhase::Idle);
        let window_rect = ctx.input(|i| i.viewport().outer_rect);
        let hover = ctx.input(|i| i.pointer.hover_pos());

        if frame.grip_drag_started && idle {
            if let (Some(window_rect), Some(hover)) = (window_rect, hover) {
                self.scale_grip = Some(ScaleGrip {
                    start_prefs: *prefs,
                    start_global_mouse: window_rect.min + hover.to_vec2(),
                    preview: *prefs,
                });
            }
        } else if frame.background_drag_started && idle {
            match (window_rect, hover) {
                (Some(window_rect), Some(hover)) => {
                    self.window_drag = Some(WindowDrag {
                        start_window_pos: window_rect.min,
                        start_global_mouse: window_rect.min + hover.to_vec2(),
                    });
                }
                // No outer rect (Wayland): let the compositor move the window.
                _ => ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag),
            }
        }
    }

    fn update_window_drag(&mut self, ctx: &egui::Context) {
        let Some(drag) = self.window_drag else {
            return;
        };
        let window_rect = ctx
            .input(|i| i.viewport().outer_rect)
            .unwrap_or(egui::Rect::ZERO);

        if ctx.input(|i| i.pointer.button_released(egui::PointerButton::Primary)) {
            self.window_drag = None;
            self.dock.set_window_pos(window_rect.min);
            return;
        }

        if let Some(hover_pos) = ctx.input(|i| i.pointer.hover_pos()) {
            let current_global_mouse = window_rect.min + hover_pos.to_vec2();
            let new_origin = drag.start_window_pos + (current_global_mouse - drag.start_global_mouse);
            ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(new_origin));
        }
    }

    fn update_scale_grip(&mut self, ctx: &egui::Context) {
        let Some(mut grip) = self.scale_grip else {
            return;
        };

        if ctx.input(|i| i.pointer.button_released(egui::PointerButton::Primary)) {
            self.scale_grip = None;
            self.dock.set_scale(grip.preview.scale_percent);
            return;
        }

        let origin = ctx.input(|i| i.viewport().outer_rect).map(|r| r.min);
        if let (Some(origin), Some(hover_pos)) = (origin, ctx.input(|i| i.pointer.hover_pos())) {
            grip.track(origin + hover_pos.to_vec2());
            self.scale_grip = Some(grip);
            ctx.request_repaint();
        }
    }

    fn apply_actions(
        &mut self,
        ctx: &egui::Context,
        tile_actions: Vec<TileAction>,
        panel_actions: Vec<PanelAction>,
    ) {
        for action in tile_actions {
            match action {
                TileAction::Launch(id) => match self.dock.launch(id) {
                    Ok(()) => self.selected = Some(id),
                    Err(err) => self.show_warning(err.to_string()),
                },
                TileAction::Reveal(id) => {
                    if let Err(err) = self.dock.reveal(id) {
                        self.show_warning(err.to_string());
                    }
                }
                TileAction::Remove(id) => {
                    self.dock.remove(id);
                }
            }
        }

        for action in panel_actions {
            match action {
                PanelAction::Orientation(orientation) => self.dock.set_orientation(orientation),
                PanelAction::Opacity(percent) => self.dock.set_opacity(percent),
                PanelAction::ResetScale => self.dock.set_scale(DEFAULT_SCALE),
                PanelAction::Close => {
                    info!("closing via context menu");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }

    fn draw_ghost(&mut self, ctx: &egui::Context, prefs: &PanelPreferences) {
        let Some(ghost) = self.dock.session().ghost().copied() else {
            return;
        };
        let Some(item) = self.dock.store().get_by_id(ghost.source) else {
            return;
        };
        let theme = DockTheme::default();
        let scale = prefs.scale_factor();
        let rect = ghost.rect();
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drag_ghost"),
        ));
        painter.rect_filled(
            rect.expand(DROP_SHADOW * scale),
            (TILE_ROUNDING + DROP_SHADOW) * scale,
            egui::Color32::from_rgba_premultiplied(0, 0, 0, 32),
        );
        let texture = self.textures.get_or_load(ctx, item);
        paint_tile(
            &painter,
            rect,
            texture,
            theme.tile_selected,
            Some(theme.drop_hint),
            ghost.opacity,
            scale,
            &theme,
        );
        ctx.request_repaint();
    }

    fn draw_warning_overlay(&mut self, ctx: &egui::Context) {
        let Some(toast) = &self.toast else {
            return;
        };
        if toast.shown_at.elapsed() >= TOAST_DURATION {
            self.toast = None;
            return;
        }
        let theme = DockTheme::default();
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Tooltip,
            egui::Id::new("warning"),
        ));
        let rect = ctx.screen_rect();
        let galley = painter.layout(
            toast.message.clone(),
            egui::FontId::proportional(13.0),
            theme.toast_text,
            (rect.width() - 24.0).max(40.0),
        );
        let text_rect = galley.rect;
        let centered_rect = text_rect.translate(rect.center() - text_rect.center());
        painter.rect_filled(centered_rect.expand(6.0), 8.0, theme.toast_bg);
        painter.rect_stroke(
            centered_rect.expand(6.0),
            8.0,
            egui::Stroke::new(1.0, theme.tile_border),
        );
        painter.galley(centered_rect.min, galley, theme.toast_text);
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn draw_panel_menu(ui: &mut egui::Ui, prefs: &PanelPreferences, actions: &mut Vec<PanelAction>) {
    style_compact_menu(ui);

    let mut orientation = prefs.orientation;
    ui.label("Orientation");
    if ui
        .radio_value(&mut orientation, Orientation::Horizontal, "Horizontal")
        .clicked()
        || ui
            .radio_value(&mut orientation, Orientation::Vertical, "Vertical")
            .clicked()
    {
        actions.push(PanelAction::Orientation(orientation));
    }

    let mut opacity = prefs.opacity_percent;
    if ui
        .add(
            egui::Slider::new(&mut opacity, 0.0..=100.0)
                .text("Opacity")
                .suffix("%"),
        )
        .changed()
    {
        actions.push(PanelAction::Opacity(opacity));
    }

    if ui.button("Reset scale").clicked() {
        actions.push(PanelAction::ResetScale);
        ui.close_menu();
    }

    ui.separator();
    if ui.button("Close").clicked() {
        actions.push(PanelAction::Close);
        ui.close_menu();
    }
}

fn draw_scale_grip(ui: &egui::Ui, rect: egui::Rect, theme: &DockTheme, held: bool) -> bool {
    let response = ui.interact(
        rect,
        ui.make_persistent_id("scale_grip"),
        egui::Sense::drag(),
    );
    if response.hovered() || response.dragged() || held {
        ui.output_mut(|o| o.cursor_icon = egui::CursorIcon::ResizeNwSe);
    }
    let stroke = egui::Stroke::new(1.0, theme.grip);
    for step in 1..=3 {
        let inset = rect.width() * step as f32 / 4.0;
        ui.painter().line_segment(
            [
                egui::pos2(rect.max.x - inset, rect.max.y - 2.0),
                egui::pos2(rect.max.x - 2.0, rect.max.y - inset),
            ],
            stroke,
        );
    }
    response.drag_started_by(egui::PointerButton::Primary)
}

#[allow(clippy::too_many_arguments)]
fn paint_tile(
    painter: &egui::Painter,
    rect: egui::Rect,
    texture: Option<egui::TextureId>,
    fill: egui::Color32,
    border: Option<egui::Color32>,
    opacity: f32,
    scale: f32,
    theme: &DockTheme,
) {
    let rounding = TILE_ROUNDING * scale;
    painter.rect_filled(rect, rounding, fill.gamma_multiply(opacity));
    if let Some(border) = border {
        painter.rect_stroke(
            rect,
            rounding,
            egui::Stroke::new(1.0, border.gamma_multiply(opacity)),
        );
    }

    let icon_rect = egui::Rect::from_center_size(rect.center(), egui::Vec2::splat(ICON_SIDE * scale));
    match texture {
        Some(texture) => painter.image(
            texture,
            icon_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE.gamma_multiply(opacity),
        ),
        None => painter.rect_filled(icon_rect, 5.0 * scale, theme.grip.gamma_multiply(opacity)),
    };
}

/// Pointer position when it is over the panel; releases elsewhere count as
/// outside the dock.
fn pointer_inside(ctx: &egui::Context, panel_rect: egui::Rect) -> Option<egui::Pos2> {
    ctx.input(|i| i.pointer.hover_pos())
        .filter(|pos| panel_rect.contains(*pos))
}

fn rejection_message(rejected: &[(PathBuf, IngestError)]) -> Option<String> {
    match rejected {
        [] => None,
        [(path, err)] => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Some(match err {
                IngestError::Duplicate(_) => format!("{name} is already on the dock"),
                IngestError::Missing(_) => format!("{name} was not found"),
                IngestError::Unsupported(_) => format!("{name} can't be added"),
                IngestError::Copy { .. } => err.to_string(),
            })
        }
        many => Some(format!("{} items were not added", many.len())),
    }
}
