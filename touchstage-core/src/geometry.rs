//! Pointer geometry
//!
//! Midpoint, distance and angle between two pointers, plus the pointer sample
//! type delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Identifier of a pointer stream (mouse, finger or pen contact)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerId(pub u64);

/// A single pointer position as delivered by the host
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub id: PointerId,
    pub point: Point,
    /// Contact pressure in 0.0..=1.0 (0.5 when the device doesn't report it)
    #[serde(default = "default_pressure")]
    pub pressure: f64,
}

/// Pressure reported for devices without pressure sensing
pub const DEFAULT_PRESSURE: f64 = 0.5;

fn default_pressure() -> f64 {
    DEFAULT_PRESSURE
}

impl PointerSample {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id: PointerId(id),
            point: Point::new(x, y),
            pressure: default_pressure(),
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }
}

/// Average pressure across a set of pointers
pub fn mean_pressure(samples: &[PointerSample]) -> f64 {
    if samples.is_empty() {
        return DEFAULT_PRESSURE;
    }
    samples.iter().map(|s| s.pressure).sum::<f64>() / samples.len() as f64
}

pub fn midpoint(p1: Point, p2: Point) -> Point {
    p1.midpoint(p2)
}

pub fn distance(p1: Point, p2: Point) -> f64 {
    p1.distance(p2)
}

/// Angle of the line from `p1` to `p2`, in radians (screen coordinates, y down)
pub fn angle(p1: Point, p2: Point) -> f64 {
    (p2.y - p1.y).atan2(p2.x - p1.x)
}
