//! Route statistics shown next to the map.

use serde::Serialize;

use crate::model::RouteResult;

/// Combustion motorcycle emission factor, g CO2 per km.
pub const COMBUSTION_GCO2_PER_KM: f64 = 70.0;
/// Electric motorcycle emission factor (grid mix), g CO2 per km.
pub const ELECTRIC_GCO2_PER_KM: f64 = 35.0;
/// Energy content of a gallon of gasoline, kWh.
pub const GASOLINE_KWH_PER_GALLON: f64 = 33.7;
/// CO2 released burning a gallon of gasoline, kg.
pub const GASOLINE_KGCO2_PER_GALLON: f64 = 8.887;

/// Distance and duration summed over every route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TotalSummary {
    pub distance_km: f64,
    pub duration_min: f64,
}

impl TotalSummary {
    pub fn from_routes<'a>(routes: impl IntoIterator<Item = &'a RouteResult>) -> Self {
        let (meters, seconds) = routes
            .into_iter()
            .fold((0.0, 0.0), |(m, s), route| {
                (m + route.summary.distance, s + route.summary.duration)
            });
        Self {
            distance_km: meters / 1000.0,
            duration_min: seconds / 60.0,
        }
    }
}

/// One segment of the consumption model output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSample {
    pub segment: usize,
    pub power_kw: f64,
    pub soc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    pub vehicle_id: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub samples: Vec<PowerSample>,
    pub average_power_kw: Option<f64>,
    /// Running sum of segment power, used as an energy index.
    pub cumulative_energy: Vec<f64>,
    pub co2_combustion_kg: f64,
    pub co2_electric_kg: f64,
    /// CO2 of the gasoline holding the same energy as the route consumed.
    pub co2_equivalent_kg: f64,
}

impl RouteStats {
    pub fn from_route(route: &RouteResult) -> Self {
        let distance_km = route.summary.distance / 1000.0;
        let duration_min = route.summary.duration / 60.0;
        let samples = power_samples(route);

        let average_power_kw = if samples.is_empty() {
            None
        } else {
            Some(samples.iter().map(|s| s.power_kw).sum::<f64>() / samples.len() as f64)
        };

        let cumulative_energy: Vec<f64> = samples
            .iter()
            .scan(0.0, |sum, sample| {
                *sum += sample.power_kw;
                Some(*sum)
            })
            .collect();
        let energy_index = cumulative_energy.last().copied().unwrap_or(0.0);

        Self {
            vehicle_id: route.vehicle_id.clone(),
            distance_km,
            duration_min,
            samples,
            average_power_kw,
            cumulative_energy,
            co2_combustion_kg: distance_km * COMBUSTION_GCO2_PER_KM / 1000.0,
            co2_electric_kg: distance_km * ELECTRIC_GCO2_PER_KM / 1000.0,
            co2_equivalent_kg: energy_index / GASOLINE_KWH_PER_GALLON * GASOLINE_KGCO2_PER_GALLON,
        }
    }
}

/// Power and SoC paired per segment. SoC may be shorter than power.
pub fn power_samples(route: &RouteResult) -> Vec<PowerSample> {
    route
        .properties
        .power
        .iter()
        .enumerate()
        .map(|(segment, &power_kw)| PowerSample {
            segment,
            power_kw,
            soc: route.properties.soc.get(segment).copied().flatten(),
        })
        .collect()
}

/// Row of the multi-vehicle comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleComparison {
    pub vehicle_id: String,
    pub distance_km: f64,
    pub duration_min: f64,
}

/// Vehicles with a non-zero distance and duration.
pub fn compare<'a>(routes: impl IntoIterator<Item = &'a RouteResult>) -> Vec<VehicleComparison> {
    routes
        .into_iter()
        .filter(|r| r.summary.distance > 0.0 && r.summary.duration > 0.0)
        .map(|r| VehicleComparison {
            vehicle_id: r.vehicle_id.clone(),
            distance_km: r.summary.distance / 1000.0,
            duration_min: r.summary.duration / 60.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LineString;
    use crate::model::{RouteProperties, RouteSummary};

    fn route(id: &str, distance: f64, duration: f64, power: Vec<f64>, soc: Vec<Option<f64>>) -> RouteResult {
        RouteResult {
            vehicle_id: id.to_string(),
            geometry: LineString::default(),
            summary: RouteSummary { distance, duration },
            alternatives: Vec::new(),
            properties: RouteProperties {
                power,
                soc,
                ..RouteProperties::default()
            },
            charge_points: Vec::new(),
        }
    }

    #[test]
    fn test_total_summary() {
        let routes = vec![
            route("moto-1", 1500.0, 120.0, vec![], vec![]),
            route("moto-2", 500.0, 60.0, vec![], vec![]),
        ];
        let total = TotalSummary::from_routes(&routes);
        assert_eq!(total.distance_km, 2.0);
        assert_eq!(total.duration_min, 3.0);
        assert_eq!(TotalSummary::from_routes(&Vec::<RouteResult>::new()), TotalSummary::default());
    }

    #[test]
    fn test_route_stats() {
        let stats = RouteStats::from_route(&route(
            "moto-1",
            10_000.0,
            900.0,
            vec![2.0, 4.0, 6.0],
            vec![Some(0.99), Some(0.98)],
        ));
        assert_eq!(stats.average_power_kw, Some(4.0));
        assert_eq!(stats.cumulative_energy, vec![2.0, 6.0, 12.0]);
        assert_eq!(stats.samples[2].soc, None);
        assert!((stats.co2_combustion_kg - 0.7).abs() < 1e-12);
        assert!((stats.co2_electric_kg - 0.35).abs() < 1e-12);
        assert!((stats.co2_equivalent_kg - 12.0 / 33.7 * 8.887).abs() < 1e-12);
    }

    #[test]
    fn test_route_stats_without_power() {
        let stats = RouteStats::from_route(&route("moto-1", 0.0, 0.0, vec![], vec![]));
        assert_eq!(stats.average_power_kw, None);
        assert_eq!(stats.co2_equivalent_kg, 0.0);
    }

    #[test]
    fn test_compare_skips_empty_routes() {
        let routes = vec![
            route("moto-1", 2000.0, 300.0, vec![], vec![]),
            route("moto-2", 0.0, 0.0, vec![], vec![]),
        ];
        let rows = compare(&routes);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vehicle_id, "moto-1");
        assert_eq!(rows[0].duration_min, 5.0);
    }
}
