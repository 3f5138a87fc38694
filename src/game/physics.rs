//! Spatial math: points, field bounds, pursuit and proximity checks

use serde::{Deserialize, Serialize};

use super::tuning::{FIELD_HEIGHT, FIELD_WIDTH};

/// A position or velocity in field units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Angle in radians from this point toward `other`
    pub fn angle_to(self, other: Point) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Unit vector toward `other`, or zero when the points coincide
    pub fn direction_to(self, other: Point) -> Point {
        let dist = self.distance_to(other);
        if dist <= f32::EPSILON {
            return Point::default();
        }
        Point::new((other.x - self.x) / dist, (other.y - self.y) / dist)
    }

    pub fn offset(self, delta: Point) -> Point {
        Point::new(self.x + delta.x, self.y + delta.y)
    }

    pub fn scaled(self, factor: f32) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }
}

/// Rectangular play field anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldBounds {
    pub width: f32,
    pub height: f32,
}

impl FieldBounds {
    pub const ARENA: FieldBounds = FieldBounds {
        width: FIELD_WIDTH,
        height: FIELD_HEIGHT,
    };

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// True when the point lies strictly inside the field (edges excluded)
    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > 0.0 && p.x < self.width && p.y > 0.0 && p.y < self.height
    }

    /// Clamp a body center so the whole body stays inside the field
    pub fn clamp_body(&self, p: Point, half_width: f32, half_height: f32) -> Point {
        Point::new(
            p.x.clamp(half_width, (self.width - half_width).max(half_width)),
            p.y.clamp(half_height, (self.height - half_height).max(half_height)),
        )
    }
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self::ARENA
    }
}

/// Movement and proximity helpers
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Pure pursuit: step `speed` units from `from` straight at `target`
    pub fn pursue(from: Point, target: Point, speed: f32) -> Point {
        from.offset(from.direction_to(target).scaled(speed))
    }

    /// Velocity of a projectile launched from `from` at `target`
    pub fn launch_velocity(from: Point, target: Point, speed: f32) -> Point {
        let angle = from.angle_to(target);
        Point::new(angle.cos() * speed, angle.sin() * speed)
    }

    /// Center-distance proximity test (strict)
    pub fn within(a: Point, b: Point, radius: f32) -> bool {
        a.distance_to(b) < radius
    }
}
