//! Map layout and route construction.
//!
//! Routes are authored as grid coordinates. A route must start and end on
//! the border of the grid, stay inside it, and only ever move along a row
//! or a column. Repeated waypoints are collapsed so that no segment has
//! zero length.
//!
//! Grid cells not covered by the route are tower sites.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{decimal_serde, Fixed, Vec3Fixed};

/// A cell on the map grid: column `x`, row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct GridPos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPos {
    /// Create a grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<GridPos> for (i32, i32) {
    fn from(pos: GridPos) -> Self {
        (pos.x, pos.y)
    }
}

/// Which end of a route failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// First waypoint.
    Start,
    /// Last waypoint.
    Finish,
}

/// Why a waypoint list was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Fewer than two waypoints, or all waypoints collapse into one.
    #[error("route needs at least 2 distinct waypoints, got {count}")]
    TooFewWaypoints {
        /// Number of distinct waypoints supplied.
        count: usize,
    },

    /// Waypoint outside the grid.
    #[error("waypoint ({}, {}) is out of map range", .pos.x, .pos.y)]
    OutOfBounds {
        /// Offending waypoint.
        pos: GridPos,
    },

    /// Route does not start or end on the grid border.
    #[error("{endpoint:?} waypoint ({}, {}) is not on the map edge", .pos.x, .pos.y)]
    NotOnEdge {
        /// Offending waypoint.
        pos: GridPos,
        /// Which end.
        endpoint: Endpoint,
    },

    /// Consecutive waypoints share neither row nor column.
    #[error(
        "waypoints ({}, {}) and ({}, {}) are neither same row nor same column",
        .from.x, .from.y, .to.x, .to.y
    )]
    NotAxisAligned {
        /// Segment start.
        from: GridPos,
        /// Segment end.
        to: GridPos,
    },
}

/// Ordered world-space waypoints with at least one segment.
///
/// Consecutive points always differ, so every segment has a direction.
/// [`Route::from_points`] is the only constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    points: Vec<Vec3Fixed>,
}

impl Route {
    /// Build a route from world positions, collapsing repeated points.
    pub fn from_points(points: Vec<Vec3Fixed>) -> Result<Self, RouteError> {
        let mut deduped: Vec<Vec3Fixed> = Vec::with_capacity(points.len());
        for point in points {
            if deduped.last() != Some(&point) {
                deduped.push(point);
            }
        }
        if deduped.len() < 2 {
            return Err(RouteError::TooFewWaypoints {
                count: deduped.len(),
            });
        }
        Ok(Self { points: deduped })
    }

    /// Number of waypoints (always at least 2).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a route has at least two points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Waypoint `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn point(&self, index: usize) -> Vec3Fixed {
        self.points[index]
    }

    /// First waypoint, where enemies spawn.
    #[must_use]
    pub fn first(&self) -> Vec3Fixed {
        self.points[0]
    }

    /// Last waypoint, the goal.
    #[must_use]
    pub fn last(&self) -> Vec3Fixed {
        self.points[self.points.len() - 1]
    }

    /// All waypoints.
    #[must_use]
    pub fn points(&self) -> &[Vec3Fixed] {
        &self.points
    }
}

/// A validated route together with the grid cells it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRoute {
    /// World-space route.
    pub route: Route,
    /// Distinct waypoints in route order.
    pub waypoints: Vec<GridPos>,
    /// Every cell the route passes over, in walking order.
    pub cells: Vec<GridPos>,
}

/// Grid dimensions and cell spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayout {
    /// Number of columns.
    pub cols: i32,
    /// Number of rows.
    pub rows: i32,
    /// Cell width along x.
    #[serde(with = "decimal_serde")]
    pub cell_width: Fixed,
    /// Cell depth along z.
    #[serde(with = "decimal_serde")]
    pub cell_height: Fixed,
    /// Gap between columns.
    #[serde(with = "decimal_serde")]
    pub hor_space: Fixed,
    /// Gap between rows.
    #[serde(with = "decimal_serde")]
    pub ver_space: Fixed,
    /// Height of the tower base surface.
    #[serde(with = "decimal_serde")]
    pub thickness: Fixed,
}

impl Default for MapLayout {
    fn default() -> Self {
        Self {
            cols: 10,
            rows: 10,
            cell_width: Fixed::ONE,
            cell_height: Fixed::ONE,
            hor_space: Fixed::from_num(0.5),
            ver_space: Fixed::from_num(0.5),
            thickness: Fixed::from_num(0.25),
        }
    }
}

impl MapLayout {
    /// Check if a cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.cols && pos.y >= 0 && pos.y < self.rows
    }

    /// Check if a cell lies on the outer border of the grid.
    #[must_use]
    pub fn is_on_edge(&self, pos: GridPos) -> bool {
        pos.x == 0 || pos.x == self.cols - 1 || pos.y == 0 || pos.y == self.rows - 1
    }

    /// World position of a cell's lower corner. The grid is centred on the origin.
    #[must_use]
    pub fn cell_corner(&self, pos: GridPos) -> Vec3Fixed {
        let two = Fixed::from_num(2);
        let half_width = (Fixed::from_num(self.cols) * self.cell_width
            + Fixed::from_num(self.cols - 1) * self.hor_space)
            / two;
        let half_height = (Fixed::from_num(self.rows) * self.cell_height
            + Fixed::from_num(self.rows - 1) * self.ver_space)
            / two;

        Vec3Fixed::new(
            Fixed::from_num(pos.x) * (self.cell_width + self.hor_space) - half_width,
            Fixed::ZERO,
            Fixed::from_num(pos.y) * (self.cell_height + self.ver_space) - half_height,
        )
    }

    /// World position of a cell's centre, on the ground.
    #[must_use]
    pub fn cell_center(&self, pos: GridPos) -> Vec3Fixed {
        let two = Fixed::from_num(2);
        self.cell_corner(pos)
            + Vec3Fixed::new(self.cell_width / two, Fixed::ZERO, self.cell_height / two)
    }

    /// Validate grid waypoints and convert them to a world-space route.
    pub fn build_route(&self, waypoints: &[GridPos]) -> Result<BuiltRoute, RouteError> {
        if waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints {
                count: waypoints.len(),
            });
        }

        if let Some(&pos) = waypoints.iter().find(|&&pos| !self.contains(pos)) {
            return Err(RouteError::OutOfBounds { pos });
        }

        let start = waypoints[0];
        let finish = waypoints[waypoints.len() - 1];
        if !self.is_on_edge(start) {
            return Err(RouteError::NotOnEdge {
                pos: start,
                endpoint: Endpoint::Start,
            });
        }
        if !self.is_on_edge(finish) {
            return Err(RouteError::NotOnEdge {
                pos: finish,
                endpoint: Endpoint::Finish,
            });
        }

        let mut distinct = vec![start];
        let mut cells = vec![start];
        for &to in &waypoints[1..] {
            let from = distinct[distinct.len() - 1];
            if from == to {
                continue;
            }
            if from.x != to.x && from.y != to.y {
                return Err(RouteError::NotAxisAligned { from, to });
            }

            let step = GridPos::new((to.x - from.x).signum(), (to.y - from.y).signum());
            let mut cell = from;
            while cell != to {
                cell = GridPos::new(cell.x + step.x, cell.y + step.y);
                cells.push(cell);
            }
            distinct.push(to);
        }

        let route = Route::from_points(distinct.iter().map(|&p| self.cell_center(p)).collect())?;
        Ok(BuiltRoute {
            route,
            waypoints: distinct,
            cells,
        })
    }

    /// Cells left free for towers once `covered` cells are taken by the route.
    ///
    /// Ordered column by column.
    #[must_use]
    pub fn tower_sites(&self, covered: &[GridPos]) -> Vec<GridPos> {
        let covered: HashSet<GridPos> = covered.iter().copied().collect();
        (0..self.cols)
            .flat_map(|x| (0..self.rows).map(move |y| GridPos::new(x, y)))
            .filter(|pos| !covered.contains(pos))
            .collect()
    }
}
