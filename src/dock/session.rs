//! Pointer gesture state machine for reordering tiles and dropping files.
//!
//! A press on a tile arms the session. Movement past the drag threshold turns
//! it into a drag with a ghost that follows the pointer; releasing commits a
//! single move. Files dragged in from outside skip the armed phase and commit
//! an ordered insertion on drop. Leaving the window, releasing outside it or
//! an explicit [`DragSession::cancel`] restores the pre-drag order.
//!
//! With [`PreviewStrategy::DeferToDrop`] nothing in the store changes until
//! the drop. [`PreviewStrategy::LivePlaceholder`] moves the dragged tile on
//! every pointer move and keeps a placeholder slot under hovering files.

use super::geometry::{correct_move_target, estimate_index, Orientation};
use super::ingest::{IngestError, IngestMode, IngestionPipeline};
use super::store::{ShortcutId, ShortcutStore};
use eframe::egui;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const GHOST_OPACITY: f32 = 0.7;
pub const DIMMED_TILE_OPACITY: f32 = 0.2;
const FALLBACK_GHOST_SIDE: f32 = 48.0;

/// Minimum displacement from the press point, per axis, before a press
/// becomes a drag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DragThreshold {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Default for DragThreshold {
    fn default() -> Self {
        Self {
            horizontal: 4.0,
            vertical: 4.0,
        }
    }
}

impl DragThreshold {
    /// Negative or non-finite axes fall back to the default for that axis.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let axis = |value: f32, fallback: f32| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                fallback
            }
        };
        Self {
            horizontal: axis(self.horizontal, defaults.horizontal),
            vertical: axis(self.vertical, defaults.vertical),
        }
    }

    pub fn exceeded(&self, press: egui::Pos2, now: egui::Pos2) -> bool {
        (now.x - press.x).abs() > self.horizontal || (now.y - press.y).abs() > self.vertical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewStrategy {
    #[default]
    DeferToDrop,
    LivePlaceholder,
}

/// Where the tiles currently are on screen, in drawn order (placeholder
/// included when one is shown).
#[derive(Debug, Clone, Copy)]
pub struct TileLayout<'a> {
    pub orientation: Orientation,
    pub bounds: &'a [Option<egui::Rect>],
}

impl<'a> TileLayout<'a> {
    pub fn new(orientation: Orientation, bounds: &'a [Option<egui::Rect>]) -> Self {
        Self {
            orientation,
            bounds,
        }
    }
}

/// Translucent copy of the dragged tile, drawn above the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostSurface {
    pub source: ShortcutId,
    pub size: egui::Vec2,
    pub center: egui::Pos2,
    pub opacity: f32,
}

impl GhostSurface {
    fn new(source: ShortcutId, size: egui::Vec2, pointer: egui::Pos2) -> Self {
        Self {
            source,
            size,
            center: pointer,
            opacity: GHOST_OPACITY,
        }
    }

    pub fn rect(&self) -> egui::Rect {
        egui::Rect::from_center_size(self.center, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragPayload {
    /// A tile of this dock; `origin` is where it sat when the drag began.
    Internal { id: ShortcutId, origin: usize },
    External { paths: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    Armed {
        id: ShortcutId,
        press: egui::Pos2,
    },
    Dragging {
        payload: DragPayload,
        ghost: Option<GhostSurface>,
    },
}

#[derive(Debug, Default)]
pub struct DropReport {
    pub index: usize,
    pub added: Vec<ShortcutId>,
    pub rejected: Vec<(PathBuf, IngestError)>,
}

#[derive(Debug)]
pub enum Commit {
    Moved {
        id: ShortcutId,
        from: usize,
        to: usize,
    },
    Inserted(DropReport),
}

#[derive(Debug)]
pub enum SessionOutcome {
    /// Nothing resolved yet.
    Pending,
    /// Press and release without crossing the threshold.
    Launch(ShortcutId),
    Committed(Commit),
    Cancelled,
}

impl SessionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

#[derive(Debug)]
pub struct DragSession {
    phase: DragPhase,
    threshold: DragThreshold,
    strategy: PreviewStrategy,
}

impl Default for DragSession {
    fn default() -> Self {
        Self::new(DragThreshold::default(), PreviewStrategy::default())
    }
}

impl DragSession {
    pub fn new(threshold: DragThreshold, strategy: PreviewStrategy) -> Self {
        Self {
            phase: DragPhase::Idle,
            threshold,
            strategy,
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    pub fn ghost(&self) -> Option<&GhostSurface> {
        match &self.phase {
            DragPhase::Dragging { ghost, .. } => ghost.as_ref(),
            _ => None,
        }
    }

    /// The tile being carried, if an internal drag is running.
    pub fn dragged(&self) -> Option<ShortcutId> {
        match &self.phase {
            DragPhase::Dragging {
                payload: DragPayload::Internal { id, .. },
                ..
            } => Some(*id),
            _ => None,
        }
    }

    /// Press on the tile at `index`. Ignored while another gesture runs.
    pub fn pointer_down(&mut self, store: &ShortcutStore, index: usize, pointer: egui::Pos2) {
        if !matches!(self.phase, DragPhase::Idle) {
            return;
        }
        if let Some(item) = store.get(index) {
            self.phase = DragPhase::Armed {
                id: item.id(),
                press: pointer,
            };
        }
    }

    pub fn pointer_move(
        &mut self,
        store: &mut ShortcutStore,
        pointer: egui::Pos2,
        layout: TileLayout<'_>,
    ) {
        if let DragPhase::Armed { id, press } = self.phase {
            if !self.threshold.exceeded(press, pointer) {
                return;
            }
            let Some(origin) = store.index_of(id) else {
                self.phase = DragPhase::Idle;
                return;
            };
            let size = layout
                .bounds
                .get(origin)
                .copied()
                .flatten()
                .map(|rect| rect.size())
                .unwrap_or(egui::Vec2::splat(FALLBACK_GHOST_SIDE));
            debug!("drag started for tile {origin}");
            self.phase = DragPhase::Dragging {
                payload: DragPayload::Internal { id, origin },
                ghost: Some(GhostSurface::new(id, size, pointer)),
            };
        }

        let DragPhase::Dragging { payload, ghost } = &mut self.phase else {
            return;
        };
        if let Some(ghost) = ghost {
            ghost.center = pointer;
        }
        if let (DragPayload::Internal { id, .. }, PreviewStrategy::LivePlaceholder) =
            (payload, self.strategy)
        {
            if let Some(current) = store.index_of(*id) {
                let target = internal_target(current, pointer, layout);
                store.move_item(current, target);
            }
        }
    }

    /// Release of the primary button. `pointer` is `None` when the release
    /// happened outside the dock.
    pub fn pointer_up(
        &mut self,
        store: &mut ShortcutStore,
        pointer: Option<egui::Pos2>,
        layout: TileLayout<'_>,
    ) -> SessionOutcome {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => SessionOutcome::Pending,
            DragPhase::Armed { id, press } => match pointer {
                Some(p) if self.threshold.exceeded(press, p) => SessionOutcome::Pending,
                _ => SessionOutcome::Launch(id),
            },
            DragPhase::Dragging {
                payload: DragPayload::Internal { id, origin },
                ..
            } => {
                let (Some(pointer), Some(current)) = (pointer, store.index_of(id)) else {
                    restore_internal(store, id, origin);
                    return SessionOutcome::Cancelled;
                };
                let target = internal_target(current, pointer, layout);
                store.move_item(current, target);
                let to = store.index_of(id).unwrap_or(target);
                info!("moved tile from {origin} to {to}");
                SessionOutcome::Committed(Commit::Moved {
                    id,
                    from: origin,
                    to,
                })
            }
            phase @ DragPhase::Dragging {
                payload: DragPayload::External { .. },
                ..
            } => {
                // File drags end through files_dropped / files_left.
                self.phase = phase;
                SessionOutcome::Pending
            }
        }
    }

    /// Abandons whatever gesture is running and restores the pre-drag order.
    pub fn cancel(&mut self, store: &mut ShortcutStore) -> SessionOutcome {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => SessionOutcome::Pending,
            DragPhase::Armed { .. } => SessionOutcome::Cancelled,
            DragPhase::Dragging { payload, .. } => {
                match payload {
                    DragPayload::Internal { id, origin } => restore_internal(store, id, origin),
                    DragPayload::External { .. } => {
                        store.take_placeholder();
                    }
                }
                debug!("drag cancelled");
                SessionOutcome::Cancelled
            }
        }
    }

    /// Files from outside hover the dock.
    pub fn files_hovered(
        &mut self,
        store: &mut ShortcutStore,
        paths: Vec<PathBuf>,
        pointer: Option<egui::Pos2>,
        layout: TileLayout<'_>,
    ) {
        match &mut self.phase {
            DragPhase::Dragging {
                payload: DragPayload::Internal { .. },
                ..
            } => return,
            DragPhase::Dragging {
                payload: DragPayload::External { paths: held },
                ..
            } => {
                if !paths.is_empty() {
                    *held = paths;
                }
            }
            _ => {
                debug!("external drag entered with {} item(s)", paths.len());
                self.phase = DragPhase::Dragging {
                    payload: DragPayload::External { paths },
                    ghost: None,
                };
            }
        }

        if self.strategy == PreviewStrategy::LivePlaceholder {
            let slot = pointer
                .map(|p| external_target(store, p, layout))
                .or(store.placeholder())
                .unwrap_or(store.len());
            store.set_placeholder(slot);
        }
    }

    /// Hovering files left the window without dropping.
    pub fn files_left(&mut self, store: &mut ShortcutStore) -> SessionOutcome {
        if matches!(
            self.phase,
            DragPhase::Dragging {
                payload: DragPayload::External { .. },
                ..
            }
        ) {
            self.cancel(store)
        } else {
            SessionOutcome::Pending
        }
    }

    /// Files released over the dock. Each path is ingested in order starting
    /// at the estimated slot; rejected paths are skipped.
    pub fn files_dropped(
        &mut self,
        store: &mut ShortcutStore,
        pipeline: &IngestionPipeline,
        paths: &[PathBuf],
        pointer: Option<egui::Pos2>,
        layout: TileLayout<'_>,
    ) -> SessionOutcome {
        if let DragPhase::Dragging {
            payload: DragPayload::Internal { .. },
            ..
        } = self.phase
        {
            return SessionOutcome::Pending;
        }
        self.phase = DragPhase::Idle;

        let index = pointer
            .map(|p| external_target(store, p, layout))
            .or(store.placeholder())
            .unwrap_or(store.len());
        store.take_placeholder();

        let mut report = DropReport {
            index,
            ..DropReport::default()
        };
        let mut next = index;
        for path in paths {
            match pipeline.ingest(path, store, IngestMode::Drop) {
                Ok(item) => {
                    let id = item.id();
                    if let Some(at) = store.insert(item, next) {
                        report.added.push(id);
                        next = at + 1;
                    }
                }
                Err(err) => {
                    warn!("skipping dropped item: {err}");
                    report.rejected.push((path.clone(), err));
                }
            }
        }
        info!(
            "file drop at {index}: {} added, {} skipped",
            report.added.len(),
            report.rejected.len()
        );
        SessionOutcome::Committed(Commit::Inserted(report))
    }
}

/// Post-removal landing index for the tile at `current`.
fn internal_target(current: usize, pointer: egui::Pos2, layout: TileLayout<'_>) -> usize {
    let raw = estimate_index(pointer, layout.orientation, layout.bounds, Some(current));
    correct_move_target(current, raw)
}

/// Insertion index among the stored items. When a placeholder is drawn, its
/// tile is skipped and the estimate mapped back out of the drawn order.
fn external_target(store: &ShortcutStore, pointer: egui::Pos2, layout: TileLayout<'_>) -> usize {
    let placeholder = store.placeholder();
    let raw = estimate_index(pointer, layout.orientation, layout.bounds, placeholder);
    let index = match placeholder {
        Some(slot) => correct_move_target(slot, raw),
        None => raw,
    };
    index.min(store.len())
}

fn restore_internal(store: &mut ShortcutStore, id: ShortcutId, origin: usize) {
    if let Some(current) = store.index_of(id) {
        store.move_item(current, origin);
    }
}
