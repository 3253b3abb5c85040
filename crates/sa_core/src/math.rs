//! Planar geometry for ships, modules and projectiles.
//!
//! Positions are in cells, rotations in radians. A [`Transform`] places a
//! local frame inside a parent frame; composing transforms moves module
//! frames into world space and [`Transform::relative_to`] undoes that.

use std::f64::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::units::{Angle, Distance};

/// 2D vector in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Vec2 {
    /// Origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle`.
    #[must_use]
    pub fn from_angle(angle: Angle) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Squared length (avoids sqrt).
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Squared distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        (other - self).length_squared()
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Direction of this vector. The zero vector points along +x.
    #[must_use]
    pub fn angle(self) -> Angle {
        Angle::radians(self.y.atan2(self.x))
    }

    /// Rotate counter-clockwise by `angle`.
    #[must_use]
    pub fn rotate(self, angle: Angle) -> Self {
        let (sin, cos) = angle.as_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Position plus orientation of a frame inside its parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// X offset in cells.
    pub x: f64,
    /// Y offset in cells.
    pub y: f64,
    /// Orientation relative to the parent frame.
    pub rotation: Angle,
}

impl Transform {
    /// Create a transform.
    #[must_use]
    pub fn new(x: f64, y: f64, rotation: Angle) -> Self {
        Self { x, y, rotation }
    }

    /// Create a transform at `position`.
    #[must_use]
    pub fn at(position: Vec2, rotation: Angle) -> Self {
        Self::new(position.x, position.y, rotation)
    }

    /// Position as a vector.
    #[must_use]
    pub fn position(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Unit vector along the facing direction.
    #[must_use]
    pub fn forward(self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }

    /// Map a point given in this frame into the parent frame.
    #[must_use]
    pub fn apply(self, local: Vec2) -> Vec2 {
        self.position() + local.rotate(self.rotation)
    }

    /// Map a parent-frame point into this frame.
    #[must_use]
    pub fn to_local(self, point: Vec2) -> Vec2 {
        (point - self.position()).rotate(Angle::radians(-self.rotation.as_radians()))
    }

    /// Place `child`, expressed in this frame, into the parent frame.
    #[must_use]
    pub fn compose(self, child: Self) -> Self {
        Self::at(self.apply(child.position()), self.rotation + child.rotation)
    }

    /// Express this transform inside `frame`. Inverse of [`Transform::compose`].
    #[must_use]
    pub fn relative_to(self, frame: Self) -> Self {
        Self::at(frame.to_local(self.position()), self.rotation - frame.rotation)
    }

    /// Point `distance` cells ahead along the facing direction.
    #[must_use]
    pub fn ahead(self, distance: Distance) -> Vec2 {
        self.position() + self.forward() * distance.as_cells()
    }
}

impl Add for Transform {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

/// Counter-clockwise sweep from `from` to `to`, in `[0, 2π)`.
#[must_use]
pub fn relative_angle(from: Angle, to: Angle) -> f64 {
    (to - from).as_radians()
}

/// Signed version of [`relative_angle`], in `(-π, π]`.
#[must_use]
pub fn signed_angle(from: Angle, to: Angle) -> f64 {
    let sweep = relative_angle(from, to);
    if sweep > PI {
        sweep - TAU
    } else {
        sweep
    }
}

/// Whether `point` lies inside the cone with apex `origin`, centred on
/// `direction` and `arc` radians wide.
#[must_use]
pub fn is_point_in_cone(point: Vec2, origin: Vec2, direction: Angle, arc: f64) -> bool {
    if arc >= TAU {
        return true;
    }
    let bearing = (point - origin).angle();
    signed_angle(direction, bearing).abs() <= arc / 2.0
}

/// Whether a circle touches the cone described by `cone` (apex and facing)
/// and `arc`. A circle covering the apex always intersects.
#[must_use]
pub fn cone_circle_intersect(center: Vec2, radius: Distance, cone: Transform, arc: f64) -> bool {
    if arc >= TAU {
        return true;
    }
    let offset = center - cone.position();
    let dist = offset.length();
    let radius = radius.as_cells();
    if dist <= radius {
        return true;
    }
    let widening = (radius / dist).asin();
    signed_angle(cone.rotation, offset.angle()).abs() <= arc / 2.0 + widening
}

/// Clamp `angle` to within `max_deviation` radians of `middle`.
#[must_use]
pub fn clamp_angle(angle: Angle, middle: Angle, max_deviation: f64) -> Angle {
    if max_deviation >= PI {
        return angle;
    }
    let deviation = signed_angle(middle, angle);
    if deviation.abs() <= max_deviation {
        angle
    } else {
        middle + max_deviation.copysign(deviation)
    }
}

/// Closest approach of `point` to the segment `start..end`.
///
/// Returns the distance along the segment to the closest point and the
/// perpendicular distance.
#[must_use]
pub fn closest_on_segment(start: Vec2, end: Vec2, point: Vec2) -> (f64, f64) {
    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq <= f64::EPSILON {
        return (0.0, start.distance(point));
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    let closest = start + segment * t;
    (t * length_sq.sqrt(), closest.distance(point))
}

/// Pick from `items` by weight, with `roll` uniform in `[0, 1)`.
///
/// Non-positive weights are never picked. Returns `None` when no item has a
/// positive weight.
#[must_use]
pub fn weighted_choice<T>(items: &[(T, f64)], roll: f64) -> Option<&T> {
    let total: f64 = items.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut remaining = roll.clamp(0.0, 1.0) * total;
    let mut last = None;
    for (item, weight) in items {
        if *weight <= 0.0 {
            continue;
        }
        if remaining < *weight {
            return Some(item);
        }
        remaining -= weight;
        last = Some(item);
    }
    last
}
