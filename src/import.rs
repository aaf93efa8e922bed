//! Normalisation of uploaded route files into a line FeatureCollection.
//!
//! Three layouts are recognised:
//! - a GeoJSON `FeatureCollection` (non-`LineString` features are dropped),
//! - the simulator's `bikes` output: `{ "bikes": [[{ "coords": [...] }, ...], ...] }`,
//!   one feature per leg,
//! - the dashboard's own vehicles export: `{ "vehicles": [{ "waypoints": [...] }] }`.
//!
//! Lines with fewer than two valid positions are skipped. Anything else
//! rejects the whole file; nothing is partially imported.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ImportError;
use crate::geometry::{Feature, FeatureCollection, LineString, Position};
use crate::model::{Vehicle, Waypoint, vehicle_id};

/// Leg properties carried over from the `bikes` layout.
const BIKE_SEGMENT_PROPERTIES: [&str; 4] = ["origen", "destino", "promedio_velocidad", "pendiente_media"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Keep altitude and any further dimensions instead of forcing 2D.
    pub keep_3d: bool,
}

pub fn read_route_file(path: impl AsRef<Path>, options: ImportOptions) -> Result<FeatureCollection, ImportError> {
    let text = std::fs::read_to_string(path)?;
    parse_route_file(&text, options)
}

pub fn parse_route_file(text: &str, options: ImportOptions) -> Result<FeatureCollection, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    normalize(&value, options)
}

/// Converts any recognised layout into a FeatureCollection of lines.
pub fn normalize(value: &Value, options: ImportOptions) -> Result<FeatureCollection, ImportError> {
    if value.get("type").and_then(Value::as_str) == Some("FeatureCollection") {
        debug!("importing GeoJSON FeatureCollection");
        return from_feature_collection(value, options);
    }
    if let Some(bikes) = value.get("bikes").and_then(Value::as_array) {
        debug!(groups = bikes.len(), "importing bikes layout");
        return Ok(from_bikes(bikes, options));
    }
    if let Some(vehicles) = value.get("vehicles").and_then(Value::as_array) {
        debug!(vehicles = vehicles.len(), "importing vehicles export");
        return Ok(from_vehicles(vehicles));
    }
    Err(ImportError::UnrecognizedFormat)
}

/// Turns imported lines back into vehicles whose waypoints are the line
/// vertices.
pub fn feature_collection_to_vehicles(fc: &FeatureCollection) -> Vec<Vehicle> {
    let mut fallback = 1;
    fc.features
        .iter()
        .map(|feature| {
            let id = match feature.vehicle_id() {
                Some(id) => id.to_string(),
                None => {
                    let id = vehicle_id(fallback);
                    fallback += 1;
                    id
                }
            };
            let waypoints = feature.geometry.points().into_iter().map(Waypoint::from).collect();
            Vehicle::with_waypoints(id, waypoints)
        })
        .collect()
}

fn from_feature_collection(value: &Value, options: ImportOptions) -> Result<FeatureCollection, ImportError> {
    let features = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or(ImportError::InvalidFeatureCollection)?;

    let features = features
        .iter()
        .filter_map(|feature| {
            let geometry = feature.get("geometry")?;
            if geometry.get("type").and_then(Value::as_str) != Some("LineString") {
                return None;
            }
            let line = line_from(geometry.get("coordinates")?, options)?;
            let properties = feature
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Some(Feature {
                properties,
                geometry: line,
            })
        })
        .collect();
    Ok(FeatureCollection::new(features))
}

fn from_bikes(bikes: &[Value], options: ImportOptions) -> FeatureCollection {
    let mut features = Vec::new();
    for (group_index, group) in bikes.iter().enumerate() {
        let Some(segments) = group.as_array() else {
            continue;
        };
        for (leg_index, segment) in segments.iter().enumerate() {
            let Some(line) = segment.get("coords").and_then(|c| line_from(c, options)) else {
                continue;
            };
            let mut properties = Map::new();
            properties.insert("vehicle_id".into(), vehicle_id(group_index + 1).into());
            properties.insert("leg".into(), (leg_index + 1).into());
            for key in BIKE_SEGMENT_PROPERTIES {
                if let Some(value) = segment.get(key) {
                    properties.insert(key.into(), value.clone());
                }
            }
            features.push(Feature {
                properties,
                geometry: line,
            });
        }
    }
    FeatureCollection::new(features)
}

fn from_vehicles(vehicles: &[Value]) -> FeatureCollection {
    let features = vehicles
        .iter()
        .enumerate()
        .filter_map(|(index, vehicle)| {
            let points: Vec<[f64; 2]> = vehicle
                .get("waypoints")
                .and_then(Value::as_array)?
                .iter()
                .filter_map(waypoint_point)
                .collect();
            if points.len() < 2 {
                return None;
            }
            let id = ["vehicle_id", "id", "name"]
                .iter()
                .find_map(|key| vehicle.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| vehicle_id(index + 1));
            Some(Feature::new(LineString::from_points(&points)).with_property("vehicle_id", id))
        })
        .collect();
    FeatureCollection::new(features)
}

/// A waypoint is `{ "coordinates": [lng, lat] }`, or loose lat/lng keys.
fn waypoint_point(waypoint: &Value) -> Option<[f64; 2]> {
    if let Some(coords) = waypoint.get("coordinates").and_then(Value::as_array) {
        if coords.len() >= 2 {
            return finite_pair(number(&coords[0])?, number(&coords[1])?);
        }
    }
    let lat = first_number(waypoint, &["latitude", "lat", "latitud", "y"])?;
    let lng = first_number(waypoint, &["longitude", "lng", "lon", "x"])?;
    finite_pair(lng, lat)
}

fn line_from(coords: &Value, options: ImportOptions) -> Option<LineString> {
    let positions: Vec<Position> = coords
        .as_array()?
        .iter()
        .filter_map(|c| position_from(c, options))
        .collect();
    (positions.len() >= 2).then(|| LineString::new(positions))
}

fn position_from(value: &Value, options: ImportOptions) -> Option<Position> {
    let values = value.as_array()?;
    if values.len() < 2 {
        return None;
    }
    let [lng, lat] = finite_pair(number(&values[0])?, number(&values[1])?)?;
    if !options.keep_3d {
        return Some(vec![lng, lat]);
    }
    let mut position = vec![lng, lat];
    position.extend(values[2..].iter().filter_map(number));
    Some(position)
}

fn finite_pair(lng: f64, lat: f64) -> Option<[f64; 2]> {
    (lng.is_finite() && lat.is_finite()).then_some([lng, lat])
}

/// A JSON number, or a string holding one.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn first_number(object: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| object.get(*key).and_then(number))
}
