use std::ops::{Add, Mul, Sub};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cartesian vector in meters (position) or meters per second (velocity).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Earth-fixed state of the tracked body at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSample {
    pub time: DateTime<Utc>,
    pub position: Vector3,
    pub velocity: Vector3,
}

/// Position on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticFix {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub height_m: f64,
}

/// What the display collaborator shows after a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DisplayUpdate {
    /// No element set yet.
    AwaitingData,
    Tracking {
        time: DateTime<Utc>,
        fix: GeodeticFix,
        /// Local-frame marker position, `display_distance_m` from the
        /// observer along the true line of sight.
        marker: Vector3,
        /// True observer to body distance.
        range_m: f64,
    },
}

impl DisplayUpdate {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, DisplayUpdate::AwaitingData)
    }

    pub fn fix(&self) -> Option<&GeodeticFix> {
        match self {
            DisplayUpdate::AwaitingData => None,
            DisplayUpdate::Tracking { fix, .. } => Some(fix),
        }
    }
}
