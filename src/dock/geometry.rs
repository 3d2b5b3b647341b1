use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn from_vertical(is_vertical: bool) -> Self {
        if is_vertical {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }

    pub fn is_vertical(self) -> bool {
        self == Self::Vertical
    }

    /// Coordinate of `pos` along the axis tiles are laid out on.
    pub fn axis(self, pos: egui::Pos2) -> f32 {
        match self {
            Self::Horizontal => pos.x,
            Self::Vertical => pos.y,
        }
    }

    pub fn center_of(self, rect: egui::Rect) -> f32 {
        self.axis(rect.center())
    }
}

/// Insertion index for `pointer` among `bounds`, in `[0, bounds.len()]`.
///
/// Returns the index of the first tile whose layout-axis center lies past the
/// pointer, so a tile is "crossed" exactly at its midpoint. `exclude` is the
/// tile being dragged; its own bounds never take part in the scan. Tiles whose
/// bounds are not realized yet (`None`) are skipped rather than treated as an
/// error.
pub fn estimate_index(
    pointer: egui::Pos2,
    orientation: Orientation,
    bounds: &[Option<egui::Rect>],
    exclude: Option<usize>,
) -> usize {
    let value = orientation.axis(pointer);
    for (idx, rect) in bounds.iter().enumerate() {
        if exclude == Some(idx) {
            continue;
        }
        let Some(rect) = rect else {
            continue;
        };
        if value < orientation.center_of(*rect) {
            return idx;
        }
    }
    bounds.len()
}

/// Converts an estimate taken while the item still sits at `old_index` into
/// the post-removal index space used by a move.
pub fn correct_move_target(old_index: usize, estimated: usize) -> usize {
    if old_index < estimated {
        estimated - 1
    } else {
        estimated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(count: usize) -> Vec<Option<egui::Rect>> {
        (0..count)
            .map(|i| {
                let x = i as f32 * 50.0;
                Some(egui::Rect::from_min_size(
                    egui::pos2(x, 0.0),
                    egui::vec2(48.0, 48.0),
                ))
            })
            .collect()
    }

    fn column(count: usize) -> Vec<Option<egui::Rect>> {
        (0..count)
            .map(|i| {
                let y = i as f32 * 50.0;
                Some(egui::Rect::from_min_size(
                    egui::pos2(0.0, y),
                    egui::vec2(48.0, 48.0),
                ))
            })
            .collect()
    }

    #[test]
    fn pointer_before_first_center_inserts_at_front() {
        let bounds = row(3);
        let idx = estimate_index(egui::pos2(10.0, 20.0), Orientation::Horizontal, &bounds, None);
        assert_eq!(idx, 0);
    }

    #[test]
    fn pointer_past_every_center_appends() {
        let bounds = row(3);
        let idx = estimate_index(egui::pos2(500.0, 20.0), Orientation::Horizontal, &bounds, None);
        assert_eq!(idx, 3);
    }

    #[test]
    fn crossing_happens_at_midpoint() {
        let bounds = row(3);
        // Tile 1 spans 50..98, center 74.
        assert_eq!(
            estimate_index(egui::pos2(73.0, 0.0), Orientation::Horizontal, &bounds, None),
            1
        );
        assert_eq!(
            estimate_index(egui::pos2(75.0, 0.0), Orientation::Horizontal, &bounds, None),
            2
        );
    }

    #[test]
    fn vertical_layout_uses_y_axis() {
        let bounds = column(3);
        let idx = estimate_index(egui::pos2(900.0, 60.0), Orientation::Vertical, &bounds, None);
        assert_eq!(idx, 1);
        let idx = estimate_index(egui::pos2(-900.0, 60.0), Orientation::Horizontal, &bounds, None);
        assert_eq!(idx, 0);
    }

    #[test]
    fn unrealized_tiles_do_not_constrain() {
        let mut bounds = row(3);
        bounds[0] = None;
        let idx = estimate_index(egui::pos2(10.0, 0.0), Orientation::Horizontal, &bounds, None);
        assert_eq!(idx, 1);
    }

    #[test]
    fn excluded_tile_bounds_are_ignored() {
        let bounds = row(4);
        let mut hidden = bounds.clone();
        hidden[1] = None;
        for x in [-10.0, 10.0, 30.0, 60.0, 74.0, 90.0, 130.0, 170.0, 400.0] {
            let p = egui::pos2(x, 0.0);
            assert_eq!(
                estimate_index(p, Orientation::Horizontal, &bounds, Some(1)),
                estimate_index(p, Orientation::Horizontal, &hidden, Some(1)),
                "pointer x={x}"
            );
        }
    }

    #[test]
    fn move_correction_only_applies_forward() {
        assert_eq!(correct_move_target(1, 2), 1);
        assert_eq!(correct_move_target(1, 3), 2);
        assert_eq!(correct_move_target(1, 0), 0);
        assert_eq!(correct_move_target(1, 1), 1);
    }
}
