//! Downloadable artifacts: the vehicles request, route and waypoint
//! GeoJSON, and a per-route CSV of the consumption model output.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::geometry::{Feature, FeatureCollection, LineString};
use crate::model::{RouteOptions, RouteResult, RoutesRequest, Vehicle, VehicleRequest};
use crate::stats::power_samples;

/// The request body for every vehicle, as a plain export: alternatives and
/// steps are always off.
pub fn vehicles_request(vehicles: &[Vehicle], options: &RouteOptions) -> RoutesRequest {
    let mut options = options.clone();
    options.alternatives = false;
    options.steps = false;
    RoutesRequest {
        options,
        vehicles: vehicles.iter().map(VehicleRequest::from).collect(),
    }
}

/// One feature per route with the selected alternative's geometry.
///
/// An index with no matching alternative exports an empty line.
pub fn routes_feature_collection(
    routes: &BTreeMap<String, RouteResult>,
    selected: &BTreeMap<String, usize>,
) -> FeatureCollection {
    let features = routes
        .iter()
        .map(|(vehicle_id, route)| {
            let index = selected.get(vehicle_id).copied().unwrap_or(0);
            let geometry = route
                .chosen_geometry(index)
                .map(LineString::to_2d)
                .unwrap_or_default();
            Feature::new(geometry)
                .with_property("vehicle_id", vehicle_id.as_str())
                .with_property("selected_alt", index)
        })
        .collect();
    FeatureCollection::new(features)
}

/// Waypoints of every routable vehicle as a line.
pub fn waypoints_feature_collection(vehicles: &[Vehicle]) -> FeatureCollection {
    let features = vehicles
        .iter()
        .filter(|v| v.is_routable())
        .map(|v| {
            let points: Vec<[f64; 2]> = v.waypoints.iter().map(|wp| wp.coordinates).collect();
            Feature::new(LineString::from_points(&points)).with_property("vehicle_id", v.id.as_str())
        })
        .collect();
    FeatureCollection::new(features)
}

/// `segment,power,soc` rows preceded by `#` header lines, or `None` when the
/// route carries no power series.
pub fn route_csv(route: &RouteResult) -> Option<String> {
    let samples = power_samples(route);
    if samples.is_empty() {
        return None;
    }

    let mut csv = String::new();
    let _ = writeln!(csv, "# Vehicle: {}", route.vehicle_id);
    let _ = writeln!(csv, "# Distance (km): {:.3}", route.summary.distance / 1000.0);
    let _ = writeln!(csv, "# Duration (min): {:.2}", route.summary.duration / 60.0);
    csv.push('\n');
    csv.push_str("segment,power,soc");
    for sample in samples {
        let soc = sample.soc.map(|s| s.to_string()).unwrap_or_default();
        let _ = write!(csv, "\n{},{},{}", sample.segment, sample.power_kw, soc);
    }
    Some(csv)
}

/// File name used for a route's CSV download.
pub fn route_csv_file_name(vehicle_id: &str) -> String {
    format!("route_{}.csv", vehicle_id)
}
