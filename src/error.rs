//! Error types for routing, synchronisation and file import.

use thiserror::Error;

/// Failure of a single call to the routing backend.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The request was superseded and aborted. Never shown to the user.
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {status} - {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RoutingError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RoutingError::Cancelled)
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RoutingError::Timeout
        } else {
            RoutingError::Transport(err)
        }
    }
}

/// Errors surfaced by the route synchronisation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("route synchronisation failed: {0}")]
    Routing(#[from] RoutingError),
    #[error("no route for vehicle {0}")]
    UnknownVehicle(String),
    #[error("alternative {index} out of range for {vehicle_id} ({available} alternatives)")]
    AlternativeOutOfRange {
        vehicle_id: String,
        index: usize,
        available: usize,
    },
    #[error("route synchronisation engine was disposed")]
    Disposed,
}

/// Rejection of an imported route or telemetry file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid GeoJSON: expected a FeatureCollection")]
    InvalidFeatureCollection,
    #[error("unrecognised format: use a FeatureCollection, bikes, vehicles or a point list")]
    UnrecognizedFormat,
}
