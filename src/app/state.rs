use crate::config::PanelPreferences;
use crate::dock::store::Shortcut;
use crate::dock::ShortcutId;
use eframe::egui;
use std::collections::HashMap;
use std::time::Instant;

/// GPU textures for tile icons, uploaded on first draw.
#[derive(Default)]
pub struct TileTextures {
    by_id: HashMap<ShortcutId, egui::TextureHandle>,
}

impl TileTextures {
    pub fn get_or_load(&mut self, ctx: &egui::Context, item: &Shortcut) -> Option<egui::TextureId> {
        if let Some(tex) = self.by_id.get(&item.id()) {
            return Some(tex.id());
        }
        let image = item.icon.as_ref()?;
        let tex = ctx.load_texture(
            format!("tile:{}", item.path.to_string_lossy()),
            egui::ImageData::Color(image.clone()),
            egui::TextureOptions::LINEAR,
        );
        let id = tex.id();
        self.by_id.insert(item.id(), tex);
        Some(id)
    }

    /// Frees textures of tiles that are gone.
    pub fn retain_live<'a>(&mut self, live: impl Iterator<Item = &'a Shortcut>) {
        let live: std::collections::HashSet<ShortcutId> = live.map(Shortcut::id).collect();
        self.by_id.retain(|id, _| live.contains(id));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowDrag {
    pub start_window_pos: egui::Pos2,
    pub start_global_mouse: egui::Pos2,
}

/// Resize grip in progress. The preview scale is applied on screen and only
/// saved when the grip is released.
#[derive(Debug, Clone, Copy)]
pub struct ScaleGrip {
    pub start_prefs: PanelPreferences,
    pub start_global_mouse: egui::Pos2,
    pub preview: PanelPreferences,
}

impl ScaleGrip {
    pub fn track(&mut self, global_mouse: egui::Pos2) {
        let mut preview = self.start_prefs;
        preview.adjust_scale_by_drag(global_mouse - self.start_global_mouse);
        self.preview = preview;
    }
}

/// Files dragged over the window from another application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileHover {
    #[default]
    Idle,
    Active,
    /// Cancelled by the user; stays ignored until the OS drag ends.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRoute {
    Ignore,
    Hover,
    Leave,
    Drop,
}

impl FileHover {
    pub fn route(&mut self, hovering: bool, dropped: bool) -> FileRoute {
        if dropped {
            return match std::mem::take(self) {
                Self::Cancelled => FileRoute::Ignore,
                _ => FileRoute::Drop,
            };
        }
        if hovering {
            if *self == Self::Cancelled {
                return FileRoute::Ignore;
            }
            *self = Self::Active;
            return FileRoute::Hover;
        }
        match std::mem::take(self) {
            Self::Active => FileRoute::Leave,
            _ => FileRoute::Ignore,
        }
    }

    pub fn cancel(&mut self) {
        if *self == Self::Active {
            *self = Self::Cancelled;
        }
    }
}

pub struct Toast {
    pub message: String,
    pub shown_at: Instant,
}
