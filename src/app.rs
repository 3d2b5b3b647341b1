mod state;
mod style;
mod ui;

use crate::dock::{Dock, ShortcutId, StoreEvent};
use eframe::egui;
use log::debug;
use state::{FileHover, ScaleGrip, TileTextures, Toast, WindowDrag};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

pub use style::panel_size;

pub struct DockApp {
    dock: Dock,
    textures: TileTextures,
    /// Set by the store listener; cleared once the UI has caught up.
    store_changed: Rc<Cell<bool>>,
    selected: Option<ShortcutId>,
    placed: bool,
    last_size: Option<egui::Vec2>,
    file_hover: FileHover,
    window_drag: Option<WindowDrag>,
    scale_grip: Option<ScaleGrip>,
    toast: Option<Toast>,
}

impl DockApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mut dock: Dock) -> Self {
        let store_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&store_changed);
        let ctx = cc.egui_ctx.clone();
        dock.subscribe(move |event: &StoreEvent| {
            debug!("store event {event:?}");
            flag.set(true);
            ctx.request_repaint();
        });

        Self {
            placed: dock.preferences().window_pos.is_some(),
            dock,
            textures: TileTextures::default(),
            store_changed,
            selected: None,
            last_size: None,
            file_hover: FileHover::default(),
            window_drag: None,
            scale_grip: None,
            toast: None,
        }
    }

    fn show_warning<S: Into<String>>(&mut self, message: S) {
        self.toast = Some(Toast {
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    /// Preferences as drawn: the grip preview while the grip is held.
    fn effective_prefs(&self) -> crate::config::PanelPreferences {
        self.scale_grip
            .map(|grip| grip.preview)
            .unwrap_or(*self.dock.preferences())
    }

    fn sync_after_store_change(&mut self) {
        if self.store_changed.replace(false) {
            self.textures.retain_live(self.dock.store().iter());
            if let Some(id) = self.selected {
                if self.dock.store().index_of(id).is_none() {
                    self.selected = None;
                }
            }
        }
    }
}
