//! Route synchronisation state.
//!
//! [`SyncState`] holds the per-vehicle routes, the selected alternatives and
//! the generation counter, and implements every transition of a
//! synchronisation round without doing any I/O. The tokio driver in
//! [`crate::engine`] owns the timer and the request in flight and feeds
//! their outcomes back in here.
//!
//! Invariants:
//! - `routes` never holds an entry for a vehicle that is missing from the
//!   store or has fewer than two waypoints once
//!   [`SyncState::prune_unroutable`] has run for that change.
//! - A response is applied only if its [`RoundTicket`] generation is still
//!   the current one: last issued wins, not last completed.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{RouteOptions, RouteResponse, RouteResult, RoutesRequest, Vehicle, VehicleRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing scheduled or outstanding.
    #[default]
    Idle,
    /// Waiting for the quiet period after the last change.
    Debouncing,
    /// A routing request is outstanding.
    InFlight,
    /// Pending work was dropped because routing was disabled or the engine
    /// was disposed.
    Cancelled,
}

/// A round that was issued: its generation, the ready set and the payload.
#[derive(Debug, Clone)]
pub struct RoundTicket {
    pub generation: u64,
    pub ready_ids: Vec<String>,
    pub request: RoutesRequest,
}

/// What happened to a round's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Response merged; ids of the vehicles that now have a route.
    Applied { generation: u64, vehicle_ids: Vec<String> },
    /// A newer round was issued after this one; response dropped.
    Stale { generation: u64 },
    /// The request was aborted before completing.
    Cancelled,
    /// No vehicle had enough waypoints, or routing is disabled.
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct SyncState {
    routes: BTreeMap<String, RouteResult>,
    selected_alt: BTreeMap<String, usize>,
    generation: u64,
    phase: SyncPhase,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &BTreeMap<String, RouteResult> {
        &self.routes
    }

    pub fn route(&self, vehicle_id: &str) -> Option<&RouteResult> {
        self.routes.get(vehicle_id)
    }

    pub fn selected_alternatives(&self) -> &BTreeMap<String, usize> {
        &self.selected_alt
    }

    pub fn selected_alternative(&self, vehicle_id: &str) -> Option<usize> {
        self.selected_alt.get(vehicle_id).copied()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: SyncPhase) {
        self.phase = phase;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Bumps the generation, invalidating every round issued so far.
    pub fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Drops routes and selections for vehicles that are no longer routable,
    /// including vehicles that left the store.
    ///
    /// Returns the ids that were removed.
    pub fn prune_unroutable(&mut self, vehicles: &[Vehicle]) -> Vec<String> {
        let routable: BTreeSet<&str> = vehicles
            .iter()
            .filter(|v| v.is_routable())
            .map(|v| v.id.as_str())
            .collect();
        let pruned: Vec<String> = self
            .routes
            .keys()
            .chain(self.selected_alt.keys())
            .filter(|id| !routable.contains(id.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if pruned.is_empty() {
            return pruned;
        }

        self.routes.retain(|id, _| routable.contains(id.as_str()));
        self.selected_alt.retain(|id, _| routable.contains(id.as_str()));
        debug!(?pruned, "pruned routes of unroutable vehicles");
        pruned
    }

    /// Empties routes and selections (routing disabled).
    pub fn clear(&mut self) {
        self.routes.clear();
        self.selected_alt.clear();
    }

    /// Issues a new round for the vehicles that are ready.
    ///
    /// Returns `None` when no vehicle has enough waypoints; state is left as
    /// it was. Otherwise the generation is bumped and captured in the ticket.
    pub fn begin_round(
        &mut self,
        vehicles: &[Vehicle],
        options: &RouteOptions,
        config: &SyncConfig,
    ) -> Option<RoundTicket> {
        let ready: Vec<VehicleRequest> = vehicles
            .iter()
            .filter(|v| v.is_routable())
            .map(VehicleRequest::from)
            .collect();
        if ready.is_empty() {
            return None;
        }

        let generation = self.invalidate();
        self.phase = SyncPhase::InFlight;
        Some(RoundTicket {
            generation,
            ready_ids: ready.iter().map(|v| v.vehicle_id.clone()).collect(),
            request: RoutesRequest {
                options: config.effective_options(options),
                vehicles: ready,
            },
        })
    }

    /// Merges a response if the round is still current.
    ///
    /// The response is authoritative for the ready set: afterwards `routes`
    /// holds exactly the ready vehicles the response answered for. Ids in
    /// the response that were not requested are ignored.
    pub fn apply_response(&mut self, ticket: &RoundTicket, response: RouteResponse) -> RoundOutcome {
        if !self.is_current(ticket.generation) {
            debug!(
                round = ticket.generation,
                current = self.generation,
                "discarding stale routes response"
            );
            return RoundOutcome::Stale {
                generation: ticket.generation,
            };
        }

        let ready: BTreeSet<&str> = ticket.ready_ids.iter().map(String::as_str).collect();
        let mut routes = BTreeMap::new();
        for route in response.routes {
            if ready.contains(route.vehicle_id.as_str()) {
                routes.insert(route.vehicle_id.clone(), route);
            } else {
                debug!(vehicle_id = %route.vehicle_id, "ignoring route for vehicle outside the ready set");
            }
        }
        self.routes = routes;

        self.selected_alt.retain(|id, _| ready.contains(id.as_str()));
        for id in &ticket.ready_ids {
            let available = self.routes.get(id).map_or(0, |r| r.alternatives.len());
            let selected = self.selected_alt.entry(id.clone()).or_insert(0);
            if *selected > available {
                *selected = 0;
            }
        }

        self.phase = SyncPhase::Idle;
        RoundOutcome::Applied {
            generation: ticket.generation,
            vehicle_ids: self.routes.keys().cloned().collect(),
        }
    }

    /// Chooses which alternative of a vehicle's route to show.
    ///
    /// Index 0 is the primary route; indices past the last alternative are
    /// rejected and leave the selection untouched.
    pub fn select_alternative(&mut self, vehicle_id: &str, index: usize) -> Result<(), SyncError> {
        let route = self
            .routes
            .get(vehicle_id)
            .ok_or_else(|| SyncError::UnknownVehicle(vehicle_id.to_string()))?;
        let available = route.alternatives.len();
        if index > available {
            return Err(SyncError::AlternativeOutOfRange {
                vehicle_id: vehicle_id.to_string(),
                index,
                available,
            });
        }
        self.selected_alt.insert(vehicle_id.to_string(), index);
        Ok(())
    }
}
