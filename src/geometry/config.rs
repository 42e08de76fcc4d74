//! Configuration (endpoint) types used as motion-planner queries (§6
//! "Configuration types"). All are value types with structural equality and
//! hashing so they can serve as memoization keys.

use serde::{Deserialize, Serialize};

/// A cell on a 4-connected occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub fn new(x: i32, y: i32) -> Self {
        GridCell { x, y }
    }

    pub fn manhattan_distance(&self, other: &GridCell) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }

    pub fn euclidean_distance(&self, other: &GridCell) -> f64 {
        (((self.x - other.x).pow(2) + (self.y - other.y).pow(2)) as f64).sqrt()
    }
}

/// A vertex on a pre-built point-graph roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGraphConfiguration {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

impl PointGraphConfiguration {
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        PointGraphConfiguration { id, x, y }
    }

    pub fn euclidean_distance(&self, other: &PointGraphConfiguration) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// `id` uniquely determines a vertex in its roadmap, so equality/hash on it
// alone is both sound and what lets two search paths to the same vertex
// collide for duplicate detection (§3 "Undirected graph node").
impl Eq for PointGraphConfiguration {}
impl std::hash::Hash for PointGraphConfiguration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A planar SE(2) pose, used by continuous motion models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Se2Configuration {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Se2Configuration {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Se2Configuration { x, y, yaw }
    }

    pub fn euclidean_distance(&self, other: &Se2Configuration) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// Bit-pattern equality so the type can serve as a memoization key (§4.3) —
// exact re-delivery of the same query is what callers rely on, not
// approximate numeric equality.
impl PartialEq for Se2Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.yaw.to_bits() == other.yaw.to_bits()
    }
}
impl Eq for Se2Configuration {}
impl std::hash::Hash for Se2Configuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
        self.yaw.to_bits().hash(state);
    }
}
