//! Strongly typed physical quantities.
//!
//! Distances are measured in grid cells, time in seconds. Mixing the two
//! only happens through the operators defined here, so a speed can never be
//! added to a distance by accident.

use std::f64::consts::TAU;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A length, in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distance(f64);

/// A duration, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(f64);

/// A speed, in cells per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Speed(f64);

/// An orientation, in radians, always normalized to `[0, 2π)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Angle(f64);

impl Distance {
    /// Zero length.
    pub const ZERO: Self = Self(0.0);

    /// Create a distance from a number of cells.
    #[must_use]
    pub const fn cells(value: f64) -> Self {
        Self(value)
    }

    /// Length in cells.
    #[must_use]
    pub const fn as_cells(self) -> f64 {
        self.0
    }

    /// Larger of two distances.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

impl Time {
    /// Zero duration.
    pub const ZERO: Self = Self(0.0);

    /// Create a duration from seconds.
    #[must_use]
    pub const fn seconds(value: f64) -> Self {
        Self(value)
    }

    /// Duration in seconds.
    #[must_use]
    pub const fn as_seconds(self) -> f64 {
        self.0
    }
}

impl Speed {
    /// Standing still.
    pub const ZERO: Self = Self(0.0);

    /// Create a speed from cells per second.
    #[must_use]
    pub const fn cells_per_second(value: f64) -> Self {
        Self(value)
    }

    /// Speed in cells per second.
    #[must_use]
    pub const fn as_cells_per_second(self) -> f64 {
        self.0
    }
}

impl Angle {
    /// Facing along +x.
    pub const ZERO: Self = Self(0.0);

    /// Create an angle from radians, normalizing into `[0, 2π)`.
    #[must_use]
    pub fn radians(value: f64) -> Self {
        let mut normalized = value % TAU;
        if normalized < 0.0 {
            normalized += TAU;
        }
        // -0.0 % TAU + TAU can round up to exactly TAU
        if normalized >= TAU {
            normalized = 0.0;
        }
        Self(normalized)
    }

    /// Create an angle from degrees.
    #[must_use]
    pub fn degrees(value: f64) -> Self {
        Self::radians(value.to_radians())
    }

    /// Value in radians within `[0, 2π)`.
    #[must_use]
    pub const fn as_radians(self) -> f64 {
        self.0
    }

    /// Value in degrees within `[0, 360)`.
    #[must_use]
    pub fn as_degrees(self) -> f64 {
        self.0.to_degrees()
    }

    /// Cosine of the angle.
    #[must_use]
    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    /// Sine of the angle.
    #[must_use]
    pub fn sin(self) -> f64 {
        self.0.sin()
    }
}

impl From<f64> for Angle {
    fn from(value: f64) -> Self {
        Self::radians(value)
    }
}

impl From<Angle> for f64 {
    fn from(value: Angle) -> Self {
        value.0
    }
}

/// Shorthand constructors, so `35.0.cells()` reads like the catalog tables.
pub trait UnitExt {
    /// Interpret as a distance in cells.
    fn cells(self) -> Distance;
    /// Interpret as a duration in seconds.
    fn seconds(self) -> Time;
    /// Interpret as a speed in cells per second.
    fn cells_per_second(self) -> Speed;
}

impl UnitExt for f64 {
    fn cells(self) -> Distance {
        Distance(self)
    }

    fn seconds(self) -> Time {
        Time(self)
    }

    fn cells_per_second(self) -> Speed {
        Speed(self)
    }
}

impl UnitExt for i32 {
    fn cells(self) -> Distance {
        Distance(f64::from(self))
    }

    fn seconds(self) -> Time {
        Time(f64::from(self))
    }

    fn cells_per_second(self) -> Speed {
        Speed(f64::from(self))
    }
}

macro_rules! linear_ops {
    ($ty:ident) => {
        impl Add for $ty {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $ty {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl AddAssign for $ty {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $ty {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Mul<f64> for $ty {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $ty {
            type Output = Self;

            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Neg for $ty {
            type Output = Self;

            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }
    };
}

linear_ops!(Distance);
linear_ops!(Time);
linear_ops!(Speed);

impl Div<Time> for Distance {
    type Output = Speed;

    fn div(self, rhs: Time) -> Self::Output {
        Speed(self.0 / rhs.0)
    }
}

impl Div<Speed> for Distance {
    type Output = Time;

    fn div(self, rhs: Speed) -> Self::Output {
        Time(self.0 / rhs.0)
    }
}

impl Mul<Time> for Speed {
    type Output = Distance;

    fn mul(self, rhs: Time) -> Self::Output {
        Distance(self.0 * rhs.0)
    }
}

impl Div for Time {
    type Output = f64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

impl Add<f64> for Angle {
    type Output = Self;

    fn add(self, rhs: f64) -> Self::Output {
        Self::radians(self.0 + rhs)
    }
}

impl Sub<f64> for Angle {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self::Output {
        Self::radians(self.0 - rhs)
    }
}

impl Add for Angle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::radians(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::radians(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_cross_unit_operators() {
        let range = 35.0.cells();
        let speed = 200.0.cells_per_second();
        let flight = range / speed;
        assert!((flight.as_seconds() - 0.175).abs() < 1e-12);
        assert!(((speed * flight).as_cells() - 35.0).abs() < 1e-12);
        assert!(((range / 2.0.seconds()).as_cells_per_second() - 17.5).abs() < 1e-12);
    }

    #[test]
    fn test_angle_normalization() {
        assert!((Angle::radians(-PI / 2.0).as_radians() - 1.5 * PI).abs() < 1e-12);
        assert!((Angle::radians(5.0 * PI).as_radians() - PI).abs() < 1e-9);
        assert_eq!(Angle::radians(-0.0).as_radians(), 0.0);
        assert!(Angle::radians(TAU).as_radians() < TAU);
    }

    #[test]
    fn test_angle_arithmetic_wraps() {
        let a = Angle::degrees(350.0) + 20f64.to_radians();
        assert!((a.as_degrees() - 10.0).abs() < 1e-9);
        let b = Angle::degrees(10.0) - Angle::degrees(20.0);
        assert!((b.as_degrees() - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_ratio() {
        assert!((1.0.seconds() / 5.0.seconds() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_integer_shorthand() {
        assert_eq!(3.cells(), Distance::cells(3.0));
        assert_eq!(2.seconds(), Time::seconds(2.0));
    }
}
