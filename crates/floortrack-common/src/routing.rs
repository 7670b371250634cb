//! Factory floor geometry: station centers, job path routing and the default
//! grid layout.
//!
//! Everything here is a pure function of station positions and a job's
//! location history, so the same inputs always yield the same geometry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{JobLocation, Position};

pub const STATION_WIDTH: f64 = 120.0;
pub const STATION_HEIGHT: f64 = 80.0;
pub const GRID_GAP: f64 = 40.0;
pub const ARROW_SPACING: f64 = 100.0;

pub const CANVAS_WIDTH: f64 = 1000.0;
pub const CANVAS_HEIGHT: f64 = 800.0;

/// Station id → top-left position on the canvas.
pub type StationPositions = BTreeMap<i64, Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    /// Scoring order; ties keep this order.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Top,
        Direction::Bottom,
    ];

    pub fn unit(&self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Top => (0.0, -1.0),
            Self::Bottom => (0.0, 1.0),
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Arrival,
    Transit,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowMarker {
    pub at: Position,
    pub angle_deg: f64,
}

/// A connector drawn on the canvas. `points` is a polyline: two points for
/// straight arrival and completion paths, three for an L-shaped transit
/// path (start, corner, end).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedPath {
    pub kind: PathKind,
    pub points: Vec<Position>,
    pub arrows: Vec<ArrowMarker>,
}

impl RoutedPath {
    pub fn start(&self) -> Position {
        self.points[0]
    }

    pub fn end(&self) -> Position {
        self.points[self.points.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionScore {
    pub direction: Direction,
    pub score: f64,
}

pub fn station_center(position: Position) -> Position {
    Position::new(
        position.x + STATION_WIDTH / 2.0,
        position.y + STATION_HEIGHT / 2.0,
    )
}

/// `count` markers evenly spaced along `start → end` at `t = i / (count + 1)`.
pub fn arrow_markers(start: Position, end: Position, count: usize) -> Vec<ArrowMarker> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let angle_deg = dy.atan2(dx).to_degrees();
    (1..=count)
        .map(|i| {
            let t = i as f64 / (count + 1) as f64;
            ArrowMarker {
                at: Position::new(start.x + dx * t, start.y + dy * t),
                angle_deg,
            }
        })
        .collect()
}

fn segment_arrows(start: Position, end: Position) -> Vec<ArrowMarker> {
    let length = (end.x - start.x).hypot(end.y - start.y);
    if length == 0.0 {
        return Vec::new();
    }
    let count = ((length / ARROW_SPACING).floor() as usize).max(1);
    arrow_markers(start, end, count)
}

/// L-shaped path through a single corner.
pub fn l_path(start: Position, end: Position, horizontal_first: bool) -> RoutedPath {
    let corner = if horizontal_first {
        Position::new(end.x, start.y)
    } else {
        Position::new(start.x, end.y)
    };
    let mut arrows = segment_arrows(start, corner);
    arrows.extend(segment_arrows(corner, end));
    RoutedPath {
        kind: PathKind::Transit,
        points: vec![start, corner, end],
        arrows,
    }
}

fn straight_path(kind: PathKind, start: Position, end: Position) -> RoutedPath {
    RoutedPath {
        kind,
        points: vec![start, end],
        arrows: arrow_markers(start, end, 1),
    }
}

/// Dominant direction of travel between two centers; horizontal wins ties.
pub fn movement_direction(from: Position, to: Position) -> Direction {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() >= dy.abs() {
        if dx > 0.0 { Direction::Right } else { Direction::Left }
    } else if dy > 0.0 {
        Direction::Bottom
    } else {
        Direction::Top
    }
}

/// Clearance score of every direction around the station `station_id`,
/// ordered best first.
///
/// Only stations within four widths horizontally and four heights
/// vertically count. A direction scores the smallest distance along its
/// axis to any of them (infinite when there are none), halved when one of
/// them sits in that direction's near field.
pub fn score_directions(positions: &StationPositions, station_id: i64) -> Vec<DirectionScore> {
    let Some(origin) = positions.get(&station_id).copied() else {
        return Vec::new();
    };

    let surrounding: Vec<(f64, f64)> = positions
        .iter()
        .filter(|(id, _)| **id != station_id)
        .map(|(_, pos)| (pos.x - origin.x, pos.y - origin.y))
        .filter(|(dx, dy)| dx.abs() < STATION_WIDTH * 4.0 && dy.abs() < STATION_HEIGHT * 4.0)
        .collect();

    let mut scores: Vec<DirectionScore> = Direction::ALL
        .iter()
        .map(|&direction| {
            let (ux, uy) = direction.unit();
            let clearance = surrounding
                .iter()
                .map(|(dx, dy)| {
                    if direction.is_horizontal() {
                        dx.abs()
                    } else {
                        dy.abs()
                    }
                })
                .fold(f64::INFINITY, f64::min);

            let crowded = surrounding.iter().any(|&(dx, dy)| {
                if direction.is_horizontal() {
                    dx.signum() == ux.signum()
                        && dx != 0.0
                        && dx.abs() < STATION_WIDTH * 3.0
                        && dy.abs() < STATION_HEIGHT
                } else {
                    dy.signum() == uy.signum()
                        && dy != 0.0
                        && dy.abs() < STATION_HEIGHT * 3.0
                        && dx.abs() < STATION_WIDTH
                }
            });

            DirectionScore {
                direction,
                score: if crowded { clearance * 0.5 } else { clearance },
            }
        })
        .collect();

    // Stable: equal scores keep left, right, top, bottom.
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores
}

/// Direction the arrival path comes in from: the best scored direction that
/// does not overlap the job's next hop.
pub fn arrival_direction(
    positions: &StationPositions,
    station_id: i64,
    next_hop: Option<Direction>,
) -> Option<Direction> {
    let scores = score_directions(positions, station_id);
    scores
        .iter()
        .find(|s| Some(s.direction) != next_hop)
        .or_else(|| scores.first())
        .map(|s| s.direction)
}

/// Paths to draw for `step` of a job's location history.
///
/// Step 0 gets an arrival path into the first station. Every step with a
/// following entry gets an L-shaped transit path to the next station. The
/// last hop of a completed job whose final entry has a departure time also
/// gets a completion path leading off the floor.
pub fn route_step(
    positions: &StationPositions,
    history: &[JobLocation],
    step: usize,
    job_complete: bool,
) -> Vec<RoutedPath> {
    let mut paths = Vec::new();
    let Some(current) = history.get(step) else {
        return paths;
    };
    let Some(current_pos) = positions.get(&current.asset_id).copied() else {
        return paths;
    };
    let current_center = station_center(current_pos);

    let next = history.get(step + 1);
    let next_pos = next.and_then(|entry| positions.get(&entry.asset_id).copied());

    if step == 0 {
        let next_hop =
            next_pos.map(|pos| movement_direction(current_center, station_center(pos)));
        if let Some(direction) = arrival_direction(positions, current.asset_id, next_hop) {
            let (ux, uy) = direction.unit();
            let start = Position::new(
                current_center.x + ux * STATION_WIDTH * 2.0,
                current_center.y + uy * STATION_HEIGHT * 2.0,
            );
            paths.push(straight_path(PathKind::Arrival, start, current_center));
        }
    }

    let (Some(next), Some(next_pos)) = (next, next_pos) else {
        return paths;
    };
    if next_pos == current_pos {
        return paths;
    }

    let next_center = station_center(next_pos);
    let dx = next_center.x - current_center.x;
    let dy = next_center.y - current_center.y;
    paths.push(l_path(current_center, next_center, dx.abs() >= dy.abs()));

    let last_hop = step + 2 == history.len();
    if job_complete && last_hop && next.departure_time.is_some() {
        let end = if dx.abs() > dy.abs() {
            Position::new(
                next_center.x + dx.signum() * STATION_WIDTH * 2.0,
                next_center.y,
            )
        } else {
            Position::new(
                next_center.x,
                next_center.y + dy.signum() * STATION_HEIGHT * 2.0,
            )
        };
        paths.push(straight_path(PathKind::Completion, next_center, end));
    }

    paths
}

/// Default layout: a grid of `ceil(sqrt(n * 1.5))` columns centered on the
/// canvas, stations placed in the given order.
pub fn grid_layout(station_ids: &[i64]) -> StationPositions {
    let total = station_ids.len();
    if total == 0 {
        return StationPositions::new();
    }
    let cols = ((total as f64) * 1.5).sqrt().ceil() as usize;
    let rows = total.div_ceil(cols);

    let total_width = cols as f64 * STATION_WIDTH + (cols as f64 - 1.0) * GRID_GAP;
    let total_height = rows as f64 * STATION_HEIGHT + (rows as f64 - 1.0) * GRID_GAP;
    let start_x = (CANVAS_WIDTH - total_width) / 2.0;
    let start_y = (CANVAS_HEIGHT - total_height) / 2.0;

    station_ids
        .iter()
        .enumerate()
        .map(|(index, &id)| {
            let col = (index % cols) as f64;
            let row = (index / cols) as f64;
            (
                id,
                Position::new(
                    start_x + col * (STATION_WIDTH + GRID_GAP),
                    start_y + row * (STATION_HEIGHT + GRID_GAP),
                ),
            )
        })
        .collect()
}
