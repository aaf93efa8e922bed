//! Route synchronisation engine.
//!
//! [`RouteSync`] watches the vehicle list and routing options and keeps a
//! route per ready vehicle up to date through a [`RoutingClient`]. Every
//! change prunes unroutable vehicles at once, cancels whatever is pending and
//! schedules a recompute after a quiet period; at most one request is in
//! flight and only the most recently issued round may write state.
//!
//! The handle is cheap to clone. It must be used from inside a tokio
//! runtime, since changes spawn the debounce timer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::{CancelHandle, CancelToken, cancel_pair};
use crate::config::SyncConfig;
use crate::error::{RoutingError, SyncError};
use crate::model::{RouteOptions, RouteResult, Vehicle};
use crate::stats::TotalSummary;
use crate::sync::{RoundOutcome, RoundTicket, SyncPhase, SyncState};
use crate::traits::RoutingClient;

const EVENT_CAPACITY: usize = 64;

/// Notifications for whoever renders the routes.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    RoutesUpdated { generation: u64, vehicle_ids: Vec<String> },
    Discarded { generation: u64 },
    Failed { generation: u64, message: String },
    Cleared,
}

pub struct RouteSync<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for RouteSync<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<C> {
    client: C,
    config: SyncConfig,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SyncEvent>,
}

struct Inner {
    state: SyncState,
    vehicles: Vec<Vehicle>,
    options: RouteOptions,
    enabled: bool,
    disposed: bool,
    timer: Option<JoinHandle<()>>,
    in_flight: Option<CancelHandle>,
    last_error: Option<String>,
}

impl Inner {
    /// Stops the debounce timer and the request in flight, and invalidates
    /// any response still on its way.
    fn cancel_pending(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(request) = self.in_flight.take() {
            request.cancel();
        }
        self.state.invalidate();
    }
}

impl<C: RoutingClient> RouteSync<C> {
    pub fn new(client: C, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Inner {
            state: SyncState::new(),
            vehicles: Vec::new(),
            options: config.initial_options.clone(),
            enabled: true,
            disposed: false,
            timer: None,
            in_flight: None,
            last_error: None,
        };
        Self {
            shared: Arc::new(Shared {
                client,
                config,
                inner: Mutex::new(inner),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// The vehicle list changed.
    pub fn on_change(&self, vehicles: &[Vehicle]) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.vehicles = vehicles.to_vec();
        self.reconcile(&mut inner);
    }

    pub fn set_options(&self, options: RouteOptions) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.options = options;
        self.reconcile(&mut inner);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.enabled = enabled;
        self.reconcile(&mut inner);
    }

    fn reconcile(&self, inner: &mut Inner) {
        if !inner.enabled {
            inner.cancel_pending();
            inner.state.clear();
            inner.state.set_phase(SyncPhase::Cancelled);
            debug!(generation = inner.state.generation(), "routing disabled; routes cleared");
            self.emit(SyncEvent::Cleared);
            return;
        }

        inner.state.prune_unroutable(&inner.vehicles);
        inner.cancel_pending();

        let generation = inner.state.generation();
        let debounce = self.shared.config.debounce;
        let engine = self.clone();
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            engine.on_timer(generation).await;
        }));
        inner.state.set_phase(SyncPhase::Debouncing);
    }

    async fn on_timer(&self, generation: u64) {
        // Generation check and round issue happen under one lock.
        let round = {
            let mut inner = self.lock();
            if inner.disposed || !inner.enabled || !inner.state.is_current(generation) {
                return;
            }
            // Detach: later changes cancel the request, not this task.
            inner.timer = None;
            self.issue_round(&mut inner)
        };
        let Some((ticket, token)) = round else {
            return;
        };
        if let Err(err) = self.run_round(ticket, token).await {
            warn!(error = %err, "automatic route recompute failed");
        }
    }

    /// Prunes and recomputes immediately, skipping the debounce window.
    ///
    /// Backend failures are returned to the caller; existing routes are
    /// kept so the user can retry.
    pub async fn compute_now(&self) -> Result<RoundOutcome, SyncError> {
        let round = {
            let mut inner = self.lock();
            if inner.disposed {
                return Err(SyncError::Disposed);
            }
            if !inner.enabled {
                return Ok(RoundOutcome::Skipped);
            }
            let inner = &mut *inner;
            inner.state.prune_unroutable(&inner.vehicles);
            self.issue_round(inner)
        };
        match round {
            Some((ticket, token)) => self.run_round(ticket, token).await,
            None => Ok(RoundOutcome::Skipped),
        }
    }

    /// Cancels pending work and issues a round for the ready vehicles,
    /// or returns `None` when none is ready.
    fn issue_round(&self, inner: &mut Inner) -> Option<(RoundTicket, CancelToken)> {
        if !inner.vehicles.iter().any(Vehicle::is_routable) {
            if inner.state.phase() == SyncPhase::Debouncing {
                inner.state.set_phase(SyncPhase::Idle);
            }
            return None;
        }

        inner.cancel_pending();
        let ticket = inner
            .state
            .begin_round(&inner.vehicles, &inner.options, &self.shared.config)?;
        let (handle, token) = cancel_pair();
        inner.in_flight = Some(handle);
        Some((ticket, token))
    }

    async fn run_round(&self, ticket: RoundTicket, token: CancelToken) -> Result<RoundOutcome, SyncError> {
        info!(
            generation = ticket.generation,
            vehicles = ticket.ready_ids.len(),
            "requesting routes"
        );
        let result = self.shared.client.submit(&ticket.request, token).await;

        let mut inner = self.lock();
        let current = inner.state.is_current(ticket.generation);
        match result {
            Err(RoutingError::Cancelled) => {
                debug!(generation = ticket.generation, "routes request cancelled");
                Ok(RoundOutcome::Cancelled)
            }
            Err(err) if !current => {
                debug!(generation = ticket.generation, error = %err, "ignoring failure of superseded round");
                self.emit(SyncEvent::Discarded {
                    generation: ticket.generation,
                });
                Ok(RoundOutcome::Stale {
                    generation: ticket.generation,
                })
            }
            Err(err) => {
                inner.in_flight = None;
                inner.state.set_phase(SyncPhase::Idle);
                let err = SyncError::Routing(err);
                let message = err.to_string();
                inner.last_error = Some(message.clone());
                self.emit(SyncEvent::Failed {
                    generation: ticket.generation,
                    message,
                });
                Err(err)
            }
            Ok(response) => {
                let outcome = inner.state.apply_response(&ticket, response);
                match &outcome {
                    RoundOutcome::Applied {
                        generation,
                        vehicle_ids,
                    } => {
                        inner.in_flight = None;
                        inner.last_error = None;
                        info!(generation, routes = vehicle_ids.len(), "routes updated");
                        self.emit(SyncEvent::RoutesUpdated {
                            generation: *generation,
                            vehicle_ids: vehicle_ids.clone(),
                        });
                    }
                    RoundOutcome::Stale { generation } => {
                        self.emit(SyncEvent::Discarded {
                            generation: *generation,
                        });
                    }
                    RoundOutcome::Cancelled | RoundOutcome::Skipped => {}
                }
                Ok(outcome)
            }
        }
    }

    /// Chooses the alternative shown for a vehicle (0 = primary route).
    pub fn set_selected_alternative(&self, vehicle_id: &str, index: usize) -> Result<(), SyncError> {
        self.lock().state.select_alternative(vehicle_id, index)
    }

    /// Cancels everything pending and stops reacting to changes.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.cancel_pending();
        inner.state.clear();
        inner.state.set_phase(SyncPhase::Cancelled);
        inner.disposed = true;
        debug!("route sync disposed");
    }

    pub fn routes(&self) -> BTreeMap<String, RouteResult> {
        self.lock().state.routes().clone()
    }

    pub fn route(&self, vehicle_id: &str) -> Option<RouteResult> {
        self.lock().state.route(vehicle_id).cloned()
    }

    pub fn selected_alternatives(&self) -> BTreeMap<String, usize> {
        self.lock().state.selected_alternatives().clone()
    }

    pub fn options(&self) -> RouteOptions {
        self.lock().options.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn generation(&self) -> u64 {
        self.lock().state.generation()
    }

    pub fn phase(&self) -> SyncPhase {
        self.lock().state.phase()
    }

    /// Message of the last failed round, cleared by the next applied one.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Distance and duration summed over every current route.
    pub fn total_summary(&self) -> TotalSummary {
        TotalSummary::from_routes(self.lock().state.routes().values())
    }
}
