//! GeoJSON geometry types for route lines.
//!
//! Only the subset the dashboard exchanges is modelled: `LineString`
//! geometries wrapped in `Feature`s and `FeatureCollection`s. Positions keep
//! whatever dimensions the backend sent (`[lng, lat]` or `[lng, lat, alt]`)
//! until they are explicitly flattened with [`LineString::to_2d`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::haversine;

/// A GeoJSON position: `[lng, lat]` with optional extra dimensions.
pub type Position = Vec<f64>;

/// A GeoJSON `LineString` geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "LineString")]
pub struct LineString {
    #[serde(default)]
    pub coordinates: Vec<Position>,
}

impl LineString {
    pub fn new(coordinates: Vec<Position>) -> Self {
        Self { coordinates }
    }

    /// Builds a 2D line from `[lng, lat]` pairs.
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        Self {
            coordinates: points.iter().map(|p| p.to_vec()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Valid `[lng, lat]` pairs, skipping positions that are too short or
    /// not finite.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.coordinates
            .iter()
            .filter_map(|position| position_2d(position))
            .collect()
    }

    /// Altitude (third dimension) per position, if present.
    pub fn altitudes(&self) -> Vec<Option<f64>> {
        self.coordinates
            .iter()
            .map(|position| position.get(2).copied().filter(|alt| alt.is_finite()))
            .collect()
    }

    /// Drops extra dimensions and invalid positions.
    pub fn to_2d(&self) -> Self {
        Self::from_points(&self.points())
    }

    pub fn length_km(&self) -> f64 {
        haversine::path_length_km(&self.points())
    }
}

fn position_2d(position: &[f64]) -> Option<[f64; 2]> {
    match position {
        [lng, lat, ..] if lng.is_finite() && lat.is_finite() => Some([*lng, *lat]),
        _ => None,
    }
}

/// A GeoJSON `Feature` carrying a line and free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub geometry: LineString,
}

impl Feature {
    pub fn new(geometry: LineString) -> Self {
        Self {
            properties: Map::new(),
            geometry,
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn vehicle_id(&self) -> Option<&str> {
        self.properties.get("vehicle_id").and_then(Value::as_str)
    }
}

/// A GeoJSON `FeatureCollection` of lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
