use super::geometry::Orientation;
use super::ingest::{IngestMode, IngestionPipeline};
use super::session::{Commit, DragSession, SessionOutcome, TileLayout};
use super::store::{Shortcut, ShortcutId, ShortcutStore, StoreEvent};
use crate::config::{InteractionSettings, PanelPreferences, PersistedConfig, PersistenceGateway};
use crate::icons::IconResolver;
use crate::system::{LaunchError, ProcessLauncher};
use eframe::egui;
use log::{debug, info, warn};
use std::path::PathBuf;

/// The dock as a whole: the shortcut row, the gesture in progress and the
/// collaborators that touch the outside world. Every committed change is
/// written back through the persistence gateway straight away.
pub struct Dock {
    store: ShortcutStore,
    session: DragSession,
    pipeline: IngestionPipeline,
    persistence: Box<dyn PersistenceGateway>,
    launcher: Box<dyn ProcessLauncher>,
    prefs: PanelPreferences,
    interaction: InteractionSettings,
}

impl Dock {
    /// Loads the saved record and rebuilds the row from it. Paths that no
    /// longer exist are dropped.
    pub fn hydrate(
        persistence: Box<dyn PersistenceGateway>,
        launcher: Box<dyn ProcessLauncher>,
        icons: Box<dyn IconResolver>,
        managed_dir: Option<PathBuf>,
    ) -> Self {
        let config = persistence.load();
        let interaction = config.interaction.sanitized();

        let mut pipeline = IngestionPipeline::new(icons);
        if let Some(dir) = managed_dir {
            pipeline = pipeline.with_managed_dir(dir, interaction.copy_links_into_storage);
        }

        let mut store = ShortcutStore::new();
        for path in &config.shortcut_paths {
            if !path.exists() {
                info!("dropping missing shortcut {}", path.display());
                continue;
            }
            match pipeline.ingest(path, &store, IngestMode::Restore) {
                Ok(item) => {
                    store.append(item);
                }
                Err(err) => warn!("skipping saved shortcut: {err}"),
            }
        }
        info!(
            "restored {} of {} shortcut(s)",
            store.len(),
            config.shortcut_paths.len()
        );

        Self {
            store,
            session: DragSession::new(interaction.drag_threshold, interaction.preview),
            pipeline,
            persistence,
            launcher,
            prefs: config.preferences(),
            interaction,
        }
    }

    pub fn store(&self) -> &ShortcutStore {
        &self.store
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn preferences(&self) -> &PanelPreferences {
        &self.prefs
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.store.subscribe(listener);
    }

    pub fn snapshot(&self) -> PersistedConfig {
        PersistedConfig::from_parts(&self.prefs, self.store.paths(), self.interaction)
    }

    pub fn save(&self) {
        debug!("saving {} shortcut(s)", self.store.len());
        self.persistence.save(&self.snapshot());
    }

    pub fn pointer_down(&mut self, index: usize, pointer: egui::Pos2) {
        self.session.pointer_down(&self.store, index, pointer);
    }

    pub fn pointer_move(&mut self, pointer: egui::Pos2, layout: TileLayout<'_>) {
        self.session.pointer_move(&mut self.store, pointer, layout);
    }

    /// Ends a press. A click launches its tile; the launch error, if any, is
    /// handed back for the UI to show.
    pub fn pointer_up(
        &mut self,
        pointer: Option<egui::Pos2>,
        layout: TileLayout<'_>,
    ) -> Result<SessionOutcome, LaunchError> {
        let outcome = self.session.pointer_up(&mut self.store, pointer, layout);
        match &outcome {
            SessionOutcome::Launch(id) => self.launch(*id)?,
            SessionOutcome::Committed(commit) => self.after_commit(commit),
            SessionOutcome::Pending | SessionOutcome::Cancelled => {}
        }
        Ok(outcome)
    }

    pub fn cancel_drag(&mut self) -> SessionOutcome {
        self.session.cancel(&mut self.store)
    }

    pub fn files_hovered(
        &mut self,
        paths: Vec<PathBuf>,
        pointer: Option<egui::Pos2>,
        layout: TileLayout<'_>,
    ) {
        self.session
            .files_hovered(&mut self.store, paths, pointer, layout);
    }

    pub fn files_left(&mut self) -> SessionOutcome {
        self.session.files_left(&mut self.store)
    }

    pub fn files_dropped(
        &mut self,
        paths: &[PathBuf],
        pointer: Option<egui::Pos2>,
        layout: TileLayout<'_>,
    ) -> SessionOutcome {
        let outcome =
            self.session
                .files_dropped(&mut self.store, &self.pipeline, paths, pointer, layout);
        if let SessionOutcome::Committed(commit) = &outcome {
            self.after_commit(commit);
        }
        outcome
    }

    fn after_commit(&self, commit: &Commit) {
        let changed = match commit {
            Commit::Moved { from, to, .. } => from != to,
            Commit::Inserted(report) => !report.added.is_empty(),
        };
        if changed {
            self.save();
        }
    }

    /// Starts the target of `id`. The row is left as it is either way.
    pub fn launch(&self, id: ShortcutId) -> Result<(), LaunchError> {
        let Some(item) = self.store.get_by_id(id) else {
            debug!("launch of unknown shortcut {id:?} ignored");
            return Ok(());
        };
        info!("launching {}", item.path.display());
        self.launcher.launch(&item.path).inspect_err(|err| {
            warn!("launch failed: {err}");
        })
    }

    pub fn reveal(&self, id: ShortcutId) -> Result<(), LaunchError> {
        let Some(item) = self.store.get_by_id(id) else {
            return Ok(());
        };
        self.launcher.reveal(&item.path)
    }

    pub fn remove(&mut self, id: ShortcutId) -> Option<Shortcut> {
        let removed = self.store.remove(id)?;
        info!("removed shortcut {}", removed.path.display());
        self.pipeline.release(&removed, &self.store);
        self.save();
        Some(removed)
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.prefs.orientation != orientation {
            self.prefs.orientation = orientation;
            self.save();
        }
    }

    pub fn set_opacity(&mut self, percent: f32) {
        let before = self.prefs.opacity_percent;
        self.prefs.set_opacity(percent);
        if self.prefs.opacity_percent != before {
            self.save();
        }
    }

    pub fn set_scale(&mut self, percent: f32) {
        let before = self.prefs.scale_percent;
        self.prefs.set_scale(percent);
        if self.prefs.scale_percent != before {
            self.save();
        }
    }

    pub fn set_window_pos(&mut self, pos: egui::Pos2) {
        if !pos.x.is_finite() || !pos.y.is_finite() {
            return;
        }
        if self.prefs.window_pos != Some(pos) {
            self.prefs.window_pos = Some(pos);
            self.save();
        }
    }
}
