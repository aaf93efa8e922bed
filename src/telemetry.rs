//! Trip telemetry replay.
//!
//! A telemetry upload is either a route file (see [`crate::import`]), which
//! only yields a track, or a point log recorded on the motorcycle:
//!
//! ```json
//! [ { "latitude": 6.2, "longitude": -75.5, "altitude": 1490, "speed": 32.5, "pw": 1.8, "fecha": "150324:134502.00" } ]
//! ```
//!
//! `fecha` is `ddmmyy:hhmmss[.ss]` in UTC.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ImportError;
use crate::geometry::{Feature, FeatureCollection, LineString};
use crate::haversine;
use crate::import::{self, ImportOptions, first_number, number};
use crate::model::RouteResult;

/// Time step assumed when timestamps are missing or not increasing.
const DEFAULT_STEP_SECS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRow {
    pub index: usize,
    pub lat: f64,
    pub lng: f64,
    pub altitude: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub power_kw: Option<f64>,
    pub t_epoch: Option<i64>,
}

/// A parsed upload: the track to draw and the per-point rows, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryLog {
    pub track: FeatureCollection,
    pub rows: Vec<TelemetryRow>,
}

impl TelemetryLog {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ImportError> {
        if let Some(points) = value.as_array().filter(|points| is_point_log(points)) {
            return Ok(Self::from_points(points));
        }
        let track = import::normalize(value, ImportOptions::default())?;
        Ok(Self {
            track,
            rows: Vec::new(),
        })
    }

    fn from_points(points: &[Value]) -> Self {
        let rows: Vec<TelemetryRow> = points
            .iter()
            .enumerate()
            .filter_map(|(index, point)| {
                let lat = first_number(point, &["latitude", "lat"])?;
                let lng = first_number(point, &["longitude", "lng"])?;
                if !lat.is_finite() || !lng.is_finite() {
                    return None;
                }
                Some(TelemetryRow {
                    index,
                    lat,
                    lng,
                    altitude: first_number(point, &["altitude", "alt"]),
                    speed_kmh: point.get("speed").and_then(number),
                    power_kw: point.get("pw").and_then(number),
                    t_epoch: point.get("fecha").and_then(Value::as_str).and_then(parse_fecha),
                })
            })
            .collect();
        debug!(points = points.len(), rows = rows.len(), "parsed telemetry log");

        let track_points: Vec<[f64; 2]> = rows.iter().map(|r| [r.lng, r.lat]).collect();
        let track = FeatureCollection::new(vec![
            Feature::new(LineString::from_points(&track_points)).with_property("source", "telemetry"),
        ]);
        Self { track, rows }
    }

    /// The line used for distances: the first feature of the track.
    pub fn track_points(&self) -> Vec<[f64; 2]> {
        self.track
            .features
            .first()
            .map(|feature| feature.geometry.points())
            .unwrap_or_default()
    }
}

fn is_point_log(points: &[Value]) -> bool {
    points.len() > 1
        && points[0]
            .as_object()
            .is_some_and(|first| first.contains_key("latitude") || first.contains_key("lat"))
}

/// Parses `ddmmyy:hhmmss[.ss]` (UTC) into whole epoch seconds.
pub fn parse_fecha(fecha: &str) -> Option<i64> {
    let (date, time) = fecha.split_once(':')?;
    if date.len() < 6 || time.len() < 4 {
        return None;
    }
    let day: u32 = date.get(0..2)?.parse().ok()?;
    let month: u32 = date.get(2..4)?.parse().ok()?;
    let year: i32 = 2000 + date.get(4..6)?.parse::<i32>().ok()?;
    let hour: u32 = time.get(0..2)?.parse().ok()?;
    let minute: u32 = time.get(2..4)?.parse().ok()?;
    let seconds: f64 = match time.get(4..) {
        Some("") | None => 0.0,
        Some(s) => s.parse().ok()?,
    };
    if !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let datetime = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(datetime.and_utc().timestamp() + seconds.floor() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimePoint {
    pub t_s: f64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyPoint {
    pub index: usize,
    pub cum_km: f64,
    pub cum_kwh: f64,
}

/// Totals and chart series for a replayed trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryReport {
    pub total_km: f64,
    pub total_time_min: f64,
    pub total_energy_kwh: f64,
    pub power: Vec<TimePoint>,
    pub speed: Vec<TimePoint>,
    pub altitude: Vec<TimePoint>,
    pub energy_vs_distance: Vec<EnergyPoint>,
}

impl TelemetryReport {
    /// Replays the log keeping every `downsample`-th row (at least 1).
    ///
    /// Rows are sorted by time when every row has a timestamp. Energy
    /// integrates the previous row's power over each interval.
    pub fn compute(log: &TelemetryLog, downsample: usize) -> Self {
        let segment_km = haversine::segment_lengths_km(&log.track_points());
        let cumulative_km: Vec<f64> = segment_km
            .iter()
            .scan(0.0, |sum, km| {
                *sum += km;
                Some(*sum)
            })
            .collect();
        let total_km = cumulative_km.last().copied().unwrap_or(0.0);

        if log.rows.is_empty() {
            return Self {
                total_km,
                energy_vs_distance: cumulative_km
                    .iter()
                    .enumerate()
                    .map(|(index, &cum_km)| EnergyPoint {
                        index,
                        cum_km,
                        cum_kwh: 0.0,
                    })
                    .collect(),
                ..Self::default()
            };
        }

        let mut rows: Vec<&TelemetryRow> = log.rows.iter().collect();
        let timed = rows.iter().all(|r| r.t_epoch.is_some());
        if timed {
            rows.sort_by_key(|r| r.t_epoch);
        }
        let step = downsample.max(1);
        let rows: Vec<&TelemetryRow> = rows.into_iter().step_by(step).collect();

        let t0 = rows.first().and_then(|r| r.t_epoch).unwrap_or(0);
        let mut report = Self {
            total_km,
            ..Self::default()
        };
        let mut total_secs = 0.0;
        let mut cum_kwh = 0.0;

        for (i, row) in rows.iter().enumerate() {
            let t_s = match (timed, row.t_epoch) {
                (true, Some(t)) => (t - t0) as f64,
                _ => i as f64,
            };

            if i > 0 {
                let prev = rows[i - 1];
                let dt = match (timed, row.t_epoch, prev.t_epoch) {
                    (true, Some(t), Some(p)) if t > p => (t - p) as f64,
                    _ => DEFAULT_STEP_SECS,
                };
                total_secs += dt;
                cum_kwh += prev.power_kw.filter(|p| p.is_finite()).unwrap_or(0.0) * dt / 3600.0;
            }

            report.power.push(TimePoint {
                t_s,
                value: Some(row.power_kw.filter(|p| p.is_finite()).unwrap_or(0.0)),
            });
            report.speed.push(TimePoint {
                t_s,
                value: Some(row.speed_kmh.filter(|s| s.is_finite()).unwrap_or(0.0)),
            });
            report.altitude.push(TimePoint {
                t_s,
                value: row.altitude.filter(|a| a.is_finite()),
            });

            let distance_index = i.min(cumulative_km.len().saturating_sub(1));
            report.energy_vs_distance.push(EnergyPoint {
                index: i + 1,
                cum_km: cumulative_km.get(distance_index).copied().unwrap_or(0.0),
                cum_kwh,
            });
        }

        report.total_time_min = total_secs / 60.0;
        report.total_energy_kwh = cum_kwh;
        report
    }
}

/// One point of a computed route with the consumption model's values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    pub altitude: Option<f64>,
    pub power_kw: Option<f64>,
    pub soc: Option<f64>,
}

/// Per-point telemetry synthesised from a backend route.
pub fn route_telemetry(route: &RouteResult) -> Vec<RoutePoint> {
    route
        .geometry
        .coordinates
        .iter()
        .enumerate()
        .filter(|(_, position)| position.len() >= 2)
        .map(|(i, position)| RoutePoint {
            lat: position[1],
            lng: position[0],
            altitude: position.get(2).copied(),
            power_kw: route.properties.power.get(i).copied(),
            soc: route.properties.soc.get(i).copied().flatten(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fecha() {
        // 2024-03-15 13:45:02 UTC
        assert_eq!(parse_fecha("150324:134502.75"), Some(1_710_510_302));
        assert_eq!(parse_fecha("150324:134502"), Some(1_710_510_302));
        assert_eq!(parse_fecha("310224:000000"), None);
        assert_eq!(parse_fecha("garbage"), None);
    }

    #[test]
    fn test_point_log_report() {
        let log = TelemetryLog::from_value(&json!([
            { "latitude": 6.2000, "longitude": -75.5000, "altitude": 1500, "speed": 30, "pw": 3.6, "fecha": "150324:120000" },
            { "latitude": 6.2010, "longitude": -75.5000, "altitude": 1502, "speed": 36, "pw": 7.2, "fecha": "150324:120010" },
            { "latitude": 6.2020, "longitude": -75.5000, "altitude": "n/a", "speed": null, "pw": 0, "fecha": "150324:120030" }
        ]))
        .unwrap();
        assert_eq!(log.rows.len(), 3);
        assert_eq!(log.track.features.len(), 1);

        let report = TelemetryReport::compute(&log, 1);
        assert!((report.total_time_min - 0.5).abs() < 1e-9);
        // 3.6 kW for 10 s + 7.2 kW for 20 s
        let expected_kwh = 3.6 * 10.0 / 3600.0 + 7.2 * 20.0 / 3600.0;
        assert!((report.total_energy_kwh - expected_kwh).abs() < 1e-12);
        assert!(report.total_km > 0.2 && report.total_km < 0.25);
        assert_eq!(report.power[1].t_s, 10.0);
        assert_eq!(report.speed[2].value, Some(0.0));
        assert_eq!(report.altitude[2].value, None);
        assert_eq!(report.energy_vs_distance.len(), 3);
    }

    #[test]
    fn test_unsorted_log_is_sorted_by_time() {
        let log = TelemetryLog::from_value(&json!([
            { "lat": 6.2010, "lng": -75.5, "pw": 1.0, "fecha": "150324:120005" },
            { "lat": 6.2000, "lng": -75.5, "pw": 2.0, "fecha": "150324:120000" }
        ]))
        .unwrap();
        let report = TelemetryReport::compute(&log, 1);
        assert_eq!(report.power[0].value, Some(2.0));
        assert!((report.total_energy_kwh - 2.0 * 5.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_timestamps_use_unit_steps() {
        let log = TelemetryLog::from_value(&json!([
            { "lat": 6.20, "lng": -75.5, "pw": 3.6 },
            { "lat": 6.21, "lng": -75.5, "pw": 3.6 },
            { "lat": 6.22, "lng": -75.5, "pw": 3.6 },
            { "lat": 6.23, "lng": -75.5, "pw": 3.6 }
        ]))
        .unwrap();
        let report = TelemetryReport::compute(&log, 2);
        assert_eq!(report.power.len(), 2);
        assert_eq!(report.power[1].t_s, 1.0);
        assert!((report.total_energy_kwh - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_route_file_has_track_only() {
        let log = TelemetryLog::from_value(&json!({
            "vehicles": [{ "vehicle_id": "moto-1", "waypoints": [
                { "coordinates": [-75.5, 6.20] }, { "coordinates": [-75.5, 6.21] } ] }]
        }))
        .unwrap();
        assert!(log.rows.is_empty());
        let report = TelemetryReport::compute(&log, 1);
        assert_eq!(report.total_energy_kwh, 0.0);
        assert_eq!(report.energy_vs_distance.len(), 1);
        assert!(report.power.is_empty());
    }

    #[test]
    fn test_unknown_upload_rejected() {
        assert!(matches!(
            TelemetryLog::from_value(&json!([{ "foo": 1 }, { "foo": 2 }])),
            Err(ImportError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn test_route_telemetry_keeps_position_indices() {
        use crate::model::{RouteProperties, RouteSummary};

        let route = RouteResult {
            vehicle_id: "moto-1".to_string(),
            geometry: LineString::new(vec![
                vec![-75.5, 6.2, 1500.0],
                vec![-75.6],
                vec![-75.7, 6.3, 1490.0],
                vec![-75.8, 6.4],
            ]),
            summary: RouteSummary::default(),
            alternatives: Vec::new(),
            properties: RouteProperties {
                power: vec![1.0, 2.0, 3.0],
                soc: vec![Some(0.9), None],
                ..RouteProperties::default()
            },
            charge_points: Vec::new(),
        };

        let points = route_telemetry(&route);
        assert_eq!(
            points,
            vec![
                RoutePoint { lat: 6.2, lng: -75.5, altitude: Some(1500.0), power_kw: Some(1.0), soc: Some(0.9) },
                // The one-element position is skipped without shifting the series.
                RoutePoint { lat: 6.3, lng: -75.7, altitude: Some(1490.0), power_kw: Some(3.0), soc: None },
                RoutePoint { lat: 6.4, lng: -75.8, altitude: None, power_kw: None, soc: None },
            ]
        );
    }
}
