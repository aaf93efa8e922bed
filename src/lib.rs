//! moto-routes core
//!
//! Keeps multi-vehicle motorcycle routes in sync with the waypoints drawn on
//! a map, against a remote routing and consumption backend.

pub mod traits;
pub mod cancel;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod geometry;
pub mod haversine;
pub mod import;
pub mod model;
pub mod stats;
pub mod sync;
pub mod telemetry;
pub mod vehicles;
pub mod workspace;
