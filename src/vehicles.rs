//! Vehicle store: the ordered list of vehicles and their waypoints.
//!
//! Identifiers are positional (`moto-1..moto-N`), not stable: removing a
//! vehicle renumbers every remaining one so ids stay dense and ordered.
//! Mutations never fail; operations on an unknown vehicle or index are
//! no-ops and report `false`.

use crate::model::{Vehicle, Waypoint, vehicle_id};

#[derive(Debug, Clone)]
pub struct VehicleStore {
    vehicles: Vec<Vehicle>,
    active: usize,
}

impl Default for VehicleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleStore {
    /// A store with a single empty vehicle, `moto-1`, active.
    pub fn new() -> Self {
        Self {
            vehicles: vec![Vehicle::new(vehicle_id(1))],
            active: 0,
        }
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<&Vehicle> {
        self.vehicles.get(self.active)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|v| v.id.as_str())
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.vehicles.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Last waypoint of the active vehicle, used for map feedback.
    pub fn last_point(&self) -> Option<[f64; 2]> {
        self.active()
            .and_then(|v| v.waypoints.last())
            .map(|wp| wp.coordinates)
    }

    /// Appends `moto-N` (N = new length) and makes it active.
    pub fn add_vehicle(&mut self) -> &str {
        let id = vehicle_id(self.vehicles.len() + 1);
        self.vehicles.push(Vehicle::new(id));
        self.active = self.vehicles.len() - 1;
        &self.vehicles[self.active].id
    }

    /// Removes the active vehicle and renumbers the rest. The last vehicle is
    /// never removed.
    pub fn remove_vehicle(&mut self) -> bool {
        if self.vehicles.len() <= 1 {
            return false;
        }
        let index = self.active.min(self.vehicles.len() - 1);
        self.vehicles.remove(index);
        self.renumber();
        self.active = 0;
        true
    }

    pub fn add_waypoint(&mut self, id: &str, lng_lat: [f64; 2]) -> bool {
        match self.vehicle_mut(id) {
            Some(vehicle) => {
                vehicle.waypoints.push(Waypoint::from(lng_lat));
                true
            }
            None => false,
        }
    }

    /// Drops the vehicle's most recent waypoint.
    pub fn undo_waypoint(&mut self, id: &str) -> bool {
        self.vehicle_mut(id)
            .map(|vehicle| vehicle.waypoints.pop().is_some())
            .unwrap_or(false)
    }

    pub fn remove_waypoint_at(&mut self, id: &str, index: usize) -> bool {
        match self.vehicle_mut(id) {
            Some(vehicle) if index < vehicle.waypoints.len() => {
                vehicle.waypoints.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Empties every vehicle's waypoints; vehicles are kept.
    pub fn clear_all(&mut self) {
        for vehicle in &mut self.vehicles {
            vehicle.waypoints.clear();
        }
    }

    pub fn clear_active(&mut self) {
        if let Some(vehicle) = self.vehicles.get_mut(self.active) {
            vehicle.waypoints.clear();
        }
    }

    /// Replaces the whole fleet, e.g. with vehicles loaded from a file.
    ///
    /// Ids are renumbered positionally; an empty list leaves one empty
    /// vehicle behind.
    pub fn replace_all(&mut self, vehicles: Vec<Vehicle>) {
        self.vehicles = vehicles;
        if self.vehicles.is_empty() {
            self.vehicles.push(Vehicle::new(vehicle_id(1)));
        }
        self.renumber();
        self.active = 0;
    }

    fn vehicle_mut(&mut self, id: &str) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    fn renumber(&mut self) {
        for (i, vehicle) in self.vehicles.iter_mut().enumerate() {
            vehicle.id = vehicle_id(i + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(store: &VehicleStore) -> Vec<&str> {
        store.vehicles().iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn test_new_store_has_one_vehicle() {
        let store = VehicleStore::new();
        assert_eq!(ids(&store), vec!["moto-1"]);
        assert_eq!(store.active_id(), Some("moto-1"));
        assert_eq!(store.last_point(), None);
    }

    #[test]
    fn test_add_vehicle_activates_it() {
        let mut store = VehicleStore::new();
        assert_eq!(store.add_vehicle(), "moto-2");
        assert_eq!(store.add_vehicle(), "moto-3");
        assert_eq!(store.active_index(), 2);
        assert_eq!(ids(&store), vec!["moto-1", "moto-2", "moto-3"]);
    }

    #[test]
    fn test_remove_vehicle_compacts_ids() {
        let mut store = VehicleStore::new();
        store.add_vehicle();
        store.add_vehicle();
        store.add_vehicle();
        store.add_waypoint("moto-3", [1.0, 1.0]);
        store.add_waypoint("moto-4", [4.0, 4.0]);

        assert!(store.set_active(1));
        assert!(store.remove_vehicle());

        assert_eq!(ids(&store), vec!["moto-1", "moto-2", "moto-3"]);
        assert_eq!(store.active_index(), 0);
        // Former moto-3 and moto-4 shifted down by one position.
        assert_eq!(store.get("moto-2").unwrap().waypoints[0].coordinates, [1.0, 1.0]);
        assert_eq!(store.get("moto-3").unwrap().waypoints[0].coordinates, [4.0, 4.0]);
    }

    #[test]
    fn test_remove_last_vehicle_is_noop() {
        let mut store = VehicleStore::new();
        assert!(!store.remove_vehicle());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_waypoint_operations() {
        let mut store = VehicleStore::new();
        assert!(store.add_waypoint("moto-1", [-75.56, 6.20]));
        assert!(store.add_waypoint("moto-1", [-75.57, 6.21]));
        assert!(store.add_waypoint("moto-1", [-75.58, 6.22]));
        assert_eq!(store.last_point(), Some([-75.58, 6.22]));

        assert!(store.remove_waypoint_at("moto-1", 0));
        assert_eq!(store.get("moto-1").unwrap().waypoints[0].coordinates, [-75.57, 6.21]);
        assert!(!store.remove_waypoint_at("moto-1", 5));

        assert!(store.undo_waypoint("moto-1"));
        assert!(store.undo_waypoint("moto-1"));
        assert!(!store.undo_waypoint("moto-1"));
        assert!(!store.add_waypoint("moto-9", [0.0, 0.0]));
    }

    #[test]
    fn test_clear_all_keeps_vehicles() {
        let mut store = VehicleStore::new();
        store.add_vehicle();
        store.add_waypoint("moto-1", [0.0, 0.0]);
        store.add_waypoint("moto-2", [1.0, 1.0]);
        store.clear_all();
        assert_eq!(store.len(), 2);
        assert!(store.vehicles().iter().all(|v| v.waypoints.is_empty()));
    }

    #[test]
    fn test_replace_all_renumbers() {
        let mut store = VehicleStore::new();
        store.replace_all(vec![Vehicle::new("a"), Vehicle::new("b")]);
        assert_eq!(ids(&store), vec!["moto-1", "moto-2"]);
        store.replace_all(Vec::new());
        assert_eq!(ids(&store), vec!["moto-1"]);
    }
}
