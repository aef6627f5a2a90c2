//! Collision resolution. Picks the drop target under a drag gesture.
//!
//! Runs on every pointer-move tick. Strategies are tried in priority order and
//! the first non-empty result wins:
//!
//! 1. droppables containing the pointer, columns first, then cards
//! 2. droppables overlapping the dragged card, columns first
//! 3. every droppable, nearest center first
//!
//! A column hit always beats a card hit: dropping on a column means "put the
//! candidate in this stage". Cards only decide the insertion index when no
//! column is under the pointer.

use serde::{Deserialize, Serialize};

use crate::board::geometry::{Point, Rect};

/// Something a dragged card can be dropped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DropTarget {
    Column {
        #[serde(rename = "stageId")]
        stage_id: i64,
    },
    Card {
        #[serde(rename = "candidateId")]
        candidate_id: i64,
    },
}

impl DropTarget {
    pub fn is_column(&self) -> bool {
        matches!(self, DropTarget::Column { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Droppable {
    pub target: DropTarget,
    pub rect: Rect,
}

/// Where the drag currently is. `pointer` is absent for keyboard drags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragGeometry {
    pub pointer: Option<Point>,
    pub active_rect: Rect,
}

/// A ranked match between the drag and one droppable. The meaning of `score`
/// depends on the strategy that produced it (distance or overlap ratio).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Collision {
    pub target: DropTarget,
    pub score: f64,
}

pub fn resolve_collisions(geometry: &DragGeometry, droppables: &[Droppable]) -> Vec<Collision> {
    if let Some(pointer) = geometry.pointer {
        let within = pointer_within(pointer, droppables);
        if !within.is_empty() {
            let (columns, cards): (Vec<_>, Vec<_>) =
                within.into_iter().partition(|c| c.target.is_column());
            return if columns.is_empty() { cards } else { columns };
        }
    }

    let intersecting = rect_intersection(&geometry.active_rect, droppables);
    if !intersecting.is_empty() {
        let columns: Vec<Collision> = intersecting
            .iter()
            .copied()
            .filter(|c| c.target.is_column())
            .collect();
        return if columns.is_empty() {
            intersecting
        } else {
            columns
        };
    }

    closest_center(&geometry.active_rect, droppables)
}

/// The active drop target: the head of the ranked collisions.
pub fn active_target(geometry: &DragGeometry, droppables: &[Droppable]) -> Option<DropTarget> {
    resolve_collisions(geometry, droppables)
        .first()
        .map(|c| c.target)
}

/// Droppables containing the pointer, nearest (mean corner distance) first.
pub fn pointer_within(pointer: Point, droppables: &[Droppable]) -> Vec<Collision> {
    let mut hits: Vec<Collision> = droppables
        .iter()
        .filter(|d| d.rect.contains(pointer))
        .map(|d| Collision {
            target: d.target,
            score: mean_corner_distance(pointer, &d.rect),
        })
        .collect();
    hits.sort_by(|a, b| a.score.total_cmp(&b.score));
    hits
}

/// Droppables overlapping `active`, largest overlap ratio first.
pub fn rect_intersection(active: &Rect, droppables: &[Droppable]) -> Vec<Collision> {
    let mut hits: Vec<Collision> = droppables
        .iter()
        .filter_map(|d| {
            let ratio = active.intersection_ratio(&d.rect);
            (ratio > 0.0).then_some(Collision {
                target: d.target,
                score: ratio,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

/// Every droppable, nearest center first.
pub fn closest_center(active: &Rect, droppables: &[Droppable]) -> Vec<Collision> {
    let center = active.center();
    let mut hits: Vec<Collision> = droppables
        .iter()
        .map(|d| Collision {
            target: d.target,
            score: center.distance_to(d.rect.center()),
        })
        .collect();
    hits.sort_by(|a, b| a.score.total_cmp(&b.score));
    hits
}

fn mean_corner_distance(pointer: Point, rect: &Rect) -> f64 {
    rect.corners()
        .iter()
        .map(|corner| pointer.distance_to(*corner))
        .sum::<f64>()
        / 4.0
}
