//! Test fixtures for moto-routes.
//!
//! Provides:
//! - A scripted `RoutingClient` that records every request
//! - Builders for vehicles, routes and responses around Medellín

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use moto_routes::cancel::CancelToken;
use moto_routes::engine::SyncEvent;
use moto_routes::error::RoutingError;
use moto_routes::geometry::LineString;
use moto_routes::model::{
    AlternativeRoute, RouteProperties, RouteResponse, RouteResult, RouteSummary, RoutesRequest, Vehicle, Waypoint,
};
use moto_routes::traits::RoutingClient;
use tokio::sync::broadcast;
use tokio::time::Instant;

pub const PARQUE_BERRIO: [f64; 2] = [-75.5681, 6.2500];
pub const EL_POBLADO: [f64; 2] = [-75.5659, 6.2088];
pub const LAURELES: [f64; 2] = [-75.5906, 6.2447];
pub const ENVIGADO: [f64; 2] = [-75.5917, 6.1719];

/// Distance the mock reports for echoed routes, in meters.
pub const ECHO_DISTANCE: f64 = 1000.0;

// ============================================================================
// Scripted routing client
// ============================================================================

#[derive(Debug, Clone)]
pub enum Outcome {
    Routes(RouteResponse),
    Status(u16),
    /// One route per requested vehicle, `ECHO_DISTANCE` meters each.
    Echo,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Duration,
    pub outcome: Outcome,
    /// Resolve even after the token fires, like a response already on the wire.
    pub ignore_cancel: bool,
}

impl Reply {
    pub fn routes(response: RouteResponse) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Routes(response),
            ignore_cancel: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Status(status),
            ignore_cancel: false,
        }
    }

    pub fn echo() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Echo,
            ignore_cancel: false,
        }
    }

    pub fn after_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn ignoring_cancel(mut self) -> Self {
        self.ignore_cancel = true;
        self
    }

    fn resolve(self, request: &RoutesRequest) -> Result<RouteResponse, RoutingError> {
        match self.outcome {
            Outcome::Routes(response) => Ok(response),
            Outcome::Status(status) => Err(RoutingError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            Outcome::Echo => Ok(response(
                request
                    .vehicles
                    .iter()
                    .map(|v| route(&v.vehicle_id, ECHO_DISTANCE))
                    .collect(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: RoutesRequest,
    pub at: Instant,
}

/// Answers from a queue of scripted replies, echoing once it runs dry.
#[derive(Debug, Default)]
pub struct MockRoutingClient {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
    cancellations: AtomicUsize,
}

impl MockRoutingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        let mock = Self::new();
        mock.replies.lock().unwrap().extend(replies);
        mock
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<RoutesRequest> {
        self.calls.lock().unwrap().last().map(|c| c.request.clone())
    }

    /// Requests that observed their token firing.
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl RoutingClient for MockRoutingClient {
    fn submit(
        &self,
        request: &RoutesRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<RouteResponse, RoutingError>> + Send {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            at: Instant::now(),
        });
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(Reply::echo);
        let request = request.clone();

        async move {
            let delay = reply.delay;
            if reply.ignore_cancel {
                tokio::time::sleep(delay).await;
                return reply.resolve(&request);
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.cancellations.fetch_add(1, Ordering::SeqCst);
                    Err(RoutingError::Cancelled)
                }
                _ = tokio::time::sleep(delay) => reply.resolve(&request),
            }
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn vehicle(id: &str, points: &[[f64; 2]]) -> Vehicle {
    Vehicle::with_waypoints(id, points.iter().copied().map(Waypoint::from).collect())
}

pub fn route(id: &str, distance: f64) -> RouteResult {
    RouteResult {
        vehicle_id: id.to_string(),
        geometry: LineString::from_points(&[PARQUE_BERRIO, EL_POBLADO]),
        summary: RouteSummary {
            distance,
            duration: distance / 1000.0 * 60.0,
        },
        alternatives: Vec::new(),
        properties: RouteProperties::default(),
        charge_points: Vec::new(),
    }
}

pub fn route_with_alternatives(id: &str, distance: f64, alternatives: usize) -> RouteResult {
    let mut result = route(id, distance);
    result.alternatives = (0..alternatives)
        .map(|i| AlternativeRoute {
            geometry: LineString::from_points(&[PARQUE_BERRIO, LAURELES, EL_POBLADO]),
            summary: RouteSummary {
                distance: distance + 100.0 * (i + 1) as f64,
                duration: 60.0,
            },
        })
        .collect();
    result
}

pub fn response(routes: Vec<RouteResult>) -> RouteResponse {
    RouteResponse { routes }
}

// ============================================================================
// Time and events
// ============================================================================

/// Lets virtual time run forward so spawned timers and requests complete.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub async fn next_event(events: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("no sync event within 30s")
        .expect("event channel closed")
}
