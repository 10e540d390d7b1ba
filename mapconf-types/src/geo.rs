//! Geographic primitives used in configurations and interaction events.

use serde::{Deserialize, Serialize};

/// Point on the map in degrees of longitude and latitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Creates a new point.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Geographic bounding box. In configuration documents it is written as a 4-element array
/// `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct GeoBounds {
    /// Minimum longitude.
    pub west: f64,
    /// Minimum latitude.
    pub south: f64,
    /// Maximum longitude.
    pub east: f64,
    /// Maximum latitude.
    pub north: f64,
}

impl From<[f64; 4]> for GeoBounds {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl From<GeoBounds> for [f64; 4] {
    fn from(value: GeoBounds) -> Self {
        [value.west, value.south, value.east, value.north]
    }
}

impl GeoBounds {
    /// Corners of the box in the order image sources expect them: top-left, top-right,
    /// bottom-right, bottom-left.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.west, self.north],
            [self.east, self.north],
            [self.east, self.south],
            [self.west, self.south],
        ]
    }

    /// Returns true if the box has positive extent in both directions.
    pub fn is_valid(&self) -> bool {
        self.west < self.east && self.south < self.north
    }
}
