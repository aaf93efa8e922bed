//! Domain model: vehicles, waypoints, route options and the routing wire
//! format.
//!
//! Field names on the wire types match the routing backend's `/routes`
//! endpoint and must not be renamed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::LineString;

/// A vehicle needs at least this many waypoints to be routed.
pub const MIN_ROUTABLE_WAYPOINTS: usize = 2;

/// Positional vehicle identifier: `moto-1` for the first vehicle.
pub fn vehicle_id(position: usize) -> String {
    format!("moto-{}", position)
}

/// A single point a vehicle's route must pass through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl Waypoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

impl From<[f64; 2]> for Waypoint {
    fn from(coordinates: [f64; 2]) -> Self {
        Self { coordinates }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            waypoints: Vec::new(),
        }
    }

    pub fn with_waypoints(id: impl Into<String>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            id: id.into(),
            waypoints,
        }
    }

    /// Whether the vehicle has enough waypoints to request a route.
    pub fn is_routable(&self) -> bool {
        self.waypoints.len() >= MIN_ROUTABLE_WAYPOINTS
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Driving,
}

/// Service area the backend computes consumption and charge points for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum City {
    /// Medellín.
    #[default]
    Med,
    /// Bogotá.
    Bog,
    /// Área Metropolitana del Valle de Aburrá.
    Amva,
}

impl City {
    pub fn as_str(&self) -> &'static str {
        match self {
            City::Med => "med",
            City::Bog => "bog",
            City::Amva => "amva",
        }
    }
}

impl std::str::FromStr for City {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "med" => Ok(City::Med),
            "bog" => Ok(City::Bog),
            "amva" => Ok(City::Amva),
            other => Err(format!("unknown city '{}' (expected med, bog or amva)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    #[default]
    Geojson,
}

/// Routing options sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub profile: Profile,
    pub alternatives: bool,
    pub steps: bool,
    #[serde(rename = "geometries")]
    pub geometry_format: GeometryFormat,
    pub alt_count: u32,
    pub alt_share: f64,
    pub alt_weight: f64,
    pub city: City,
    pub traffic: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Driving,
            alternatives: false,
            steps: true,
            geometry_format: GeometryFormat::Geojson,
            alt_count: 1,
            alt_share: 0.6,
            alt_weight: 1.4,
            city: City::Med,
            traffic: false,
        }
    }
}

/// One vehicle in a `/routes` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRequest {
    pub vehicle_id: String,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl From<&Vehicle> for VehicleRequest {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            vehicle_id: vehicle.id.clone(),
            waypoints: vehicle.waypoints.clone(),
        }
    }
}

/// Body of a `POST /routes` request; also the "vehicles request" export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutesRequest {
    #[serde(default)]
    pub options: RouteOptions,
    #[serde(default)]
    pub vehicles: Vec<VehicleRequest>,
}

impl RoutesRequest {
    pub fn vehicle_ids(&self) -> Vec<&str> {
        self.vehicles.iter().map(|v| v.vehicle_id.as_str()).collect()
    }

    /// Vehicles described by the request, keeping their ids.
    pub fn to_vehicles(&self) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .map(|v| Vehicle::with_waypoints(v.vehicle_id.clone(), v.waypoints.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Meters.
    #[serde(default)]
    pub distance: f64,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoute {
    pub geometry: LineString,
    #[serde(default)]
    pub summary: RouteSummary,
}

/// Per-point series computed by the backend's consumption model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteProperties {
    /// Power per segment in kW.
    #[serde(default, rename = "potencia", alias = "power_series")]
    pub power: Vec<f64>,
    /// State of charge per segment.
    #[serde(default, alias = "soc_series")]
    pub soc: Vec<Option<f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Route computed by the backend for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub vehicle_id: String,
    pub geometry: LineString,
    #[serde(default)]
    pub summary: RouteSummary,
    #[serde(default)]
    pub alternatives: Vec<AlternativeRoute>,
    #[serde(default)]
    pub properties: RouteProperties,
    #[serde(default)]
    pub charge_points: Vec<Value>,
}

impl RouteResult {
    /// Geometry for an alternative index: 0 is the primary route.
    pub fn chosen_geometry(&self, index: usize) -> Option<&LineString> {
        match index {
            0 => Some(&self.geometry),
            n => self.alternatives.get(n - 1).map(|alt| &alt.geometry),
        }
    }

    /// Summary for an alternative index: 0 is the primary route.
    pub fn chosen_summary(&self, index: usize) -> Option<RouteSummary> {
        match index {
            0 => Some(self.summary),
            n => self.alternatives.get(n - 1).map(|alt| alt.summary),
        }
    }
}

/// Body of a `/routes` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub routes: Vec<RouteResult>,
}
