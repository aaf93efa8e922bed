//! Map session: the vehicle store, its route synchronisation and the
//! imported draw-only layer.
//!
//! Every store mutation is forwarded to the engine. While an imported
//! layer is shown the workspace is in draw-only mode: routing is disabled,
//! routes are cleared and the layer is drawn as is.

use std::path::Path;

use tracing::info;

use crate::config::SyncConfig;
use crate::engine::RouteSync;
use crate::error::{ImportError, SyncError};
use crate::export;
use crate::geometry::FeatureCollection;
use crate::import::{self, ImportOptions};
use crate::model::{RouteOptions, RoutesRequest};
use crate::sync::RoundOutcome;
use crate::traits::RoutingClient;
use crate::vehicles::VehicleStore;

pub struct MapWorkspace<C> {
    store: VehicleStore,
    sync: RouteSync<C>,
    imported: Option<FeatureCollection>,
}

impl<C: RoutingClient> MapWorkspace<C> {
    /// Starts a session with one empty vehicle. Needs a tokio runtime.
    pub fn new(client: C, config: SyncConfig) -> Self {
        let workspace = Self {
            store: VehicleStore::new(),
            sync: RouteSync::new(client, config),
            imported: None,
        };
        workspace.notify();
        workspace
    }

    pub fn store(&self) -> &VehicleStore {
        &self.store
    }

    pub fn sync(&self) -> &RouteSync<C> {
        &self.sync
    }

    pub fn imported_layer(&self) -> Option<&FeatureCollection> {
        self.imported.as_ref()
    }

    pub fn is_draw_only(&self) -> bool {
        self.imported.is_some()
    }

    fn notify(&self) {
        if self.is_draw_only() {
            self.sync.on_change(&[]);
        } else {
            self.sync.on_change(self.store.vehicles());
        }
    }

    pub fn add_vehicle(&mut self) {
        self.store.add_vehicle();
        self.notify();
    }

    pub fn remove_vehicle(&mut self) {
        if self.store.remove_vehicle() {
            self.notify();
        }
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        self.store.set_active(index)
    }

    /// Map click: appends a waypoint to the active vehicle.
    pub fn add_waypoint(&mut self, lng_lat: [f64; 2]) {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            return;
        };
        if self.store.add_waypoint(&id, lng_lat) {
            self.notify();
        }
    }

    pub fn undo_waypoint(&mut self) {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            return;
        };
        if self.store.undo_waypoint(&id) {
            self.notify();
        }
    }

    pub fn remove_waypoint_at(&mut self, index: usize) {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            return;
        };
        if self.store.remove_waypoint_at(&id, index) {
            self.notify();
        }
    }

    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.notify();
    }

    pub fn clear_active(&mut self) {
        self.store.clear_active();
        self.notify();
    }

    pub fn set_options(&self, options: RouteOptions) {
        self.sync.set_options(options);
    }

    /// Explicit "recalculate" action.
    pub async fn recalculate(&self) -> Result<RoundOutcome, SyncError> {
        self.sync.compute_now().await
    }

    /// Shows an imported route file without routing it.
    ///
    /// A file that cannot be parsed leaves the workspace untouched.
    pub fn import_layer(&mut self, text: &str) -> Result<&FeatureCollection, ImportError> {
        let layer = import::parse_route_file(text, ImportOptions::default())?;
        info!(features = layer.features.len(), "showing imported layer in draw-only mode");
        self.sync.set_enabled(false);
        Ok(&*self.imported.insert(layer))
    }

    pub fn import_layer_file(&mut self, path: impl AsRef<Path>) -> Result<&FeatureCollection, ImportError> {
        let text = std::fs::read_to_string(path)?;
        self.import_layer(&text)
    }

    /// Drops the imported layer and resumes routing.
    pub fn clear_layer(&mut self) {
        if self.imported.take().is_some() {
            self.sync.set_enabled(true);
            self.notify();
        }
    }

    /// Replaces the fleet with the lines of a waypoint file.
    pub fn load_waypoints(&mut self, text: &str) -> Result<(), ImportError> {
        let fc = import::parse_route_file(text, ImportOptions::default())?;
        self.store.replace_all(import::feature_collection_to_vehicles(&fc));
        self.notify();
        Ok(())
    }

    pub fn export_request(&self) -> RoutesRequest {
        export::vehicles_request(self.store.vehicles(), &self.sync.options())
    }

    pub fn export_routes(&self) -> FeatureCollection {
        export::routes_feature_collection(&self.sync.routes(), &self.sync.selected_alternatives())
    }

    pub fn export_waypoints(&self) -> FeatureCollection {
        export::waypoints_feature_collection(self.store.vehicles())
    }

    /// Ends the session, cancelling any pending routing work.
    pub fn dispose(self) {
        self.sync.dispose();
    }
}
