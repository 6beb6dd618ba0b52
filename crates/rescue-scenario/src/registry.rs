//! Scenario container
//!
//! Owns every entity of one planning scenario plus the two relation tables:
//! station ↔ vessel allowances and zone ← (station, vessel) reachability.
//! Per-entity views of a relation are computed from the table on demand, so
//! both directions always agree.

use crate::entities::{IncidentType, Station, VesselType, Zone};
use crate::ids::{IdIssuer, IncidentId, StationId, VesselId, ZoneId};
use crate::{Result, ScenarioError};
use coastal_geo::{DistanceCache, GeoPoint};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    ids: IdIssuer,
    vessels: BTreeMap<VesselId, VesselType>,
    stations: BTreeMap<StationId, Station>,
    zones: BTreeMap<ZoneId, Zone>,
    incidents: BTreeMap<IncidentId, IncidentType>,
    allowed: BTreeSet<(StationId, VesselId)>,
    reachable: BTreeSet<(ZoneId, StationId, VesselId)>,
    distances: DistanceCache,
}

impl PartialEq for Scenario {
    /// Entity graphs are equal; identifier counters and the distance memo are not compared
    fn eq(&self, other: &Self) -> bool {
        self.vessels == other.vessels
            && self.stations == other.stations
            && self.zones == other.zones
            && self.incidents == other.incidents
            && self.allowed == other.allowed
            && self.reachable == other.reachable
    }
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Identifier issue
    // ------------------------------------------------------------------

    pub fn new_vessel_id(&mut self) -> VesselId {
        self.ids.vessel()
    }

    pub fn new_station_id(&mut self) -> StationId {
        self.ids.station()
    }

    pub fn new_zone_id(&mut self) -> ZoneId {
        self.ids.zone()
    }

    pub fn new_incident_id(&mut self) -> IncidentId {
        self.ids.incident()
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    pub fn insert_vessel(&mut self, vessel: VesselType) -> Result<VesselId> {
        if !(vessel.speed_knots.is_finite() && vessel.speed_knots > 0.0) {
            return Err(ScenarioError::InvalidVessel {
                id: vessel.id,
                reason: format!("speed must be positive, got {}", vessel.speed_knots),
            });
        }
        if vessel.reach_nm.is_nan() {
            return Err(ScenarioError::InvalidVessel {
                id: vessel.id,
                reason: "reach is NaN".to_string(),
            });
        }
        if self.vessels.contains_key(&vessel.id) {
            return Err(ScenarioError::DuplicateId(vessel.id.to_string()));
        }
        let id = vessel.id;
        self.ids.observe_vessel(id);
        self.vessels.insert(id, vessel);
        Ok(id)
    }

    pub fn insert_station(&mut self, station: Station) -> Result<StationId> {
        if !station.position.is_valid() {
            return Err(ScenarioError::InvalidStation {
                id: station.id,
                reason: format!("invalid position {}", station.position),
            });
        }
        if !(0.0..=1.0).contains(&station.min_availability) {
            return Err(ScenarioError::InvalidStation {
                id: station.id,
                reason: format!("availability threshold {} outside [0, 1]", station.min_availability),
            });
        }
        if self.stations.contains_key(&station.id) {
            return Err(ScenarioError::DuplicateId(station.id.to_string()));
        }
        let id = station.id;
        self.ids.observe_station(id);
        self.stations.insert(id, station);
        Ok(id)
    }

    pub fn insert_zone(&mut self, zone: Zone) -> Result<ZoneId> {
        if !zone.position.is_valid() {
            return Err(ScenarioError::Geo(coastal_geo::GeoError::InvalidCoordinates {
                latitude: zone.position.latitude,
                longitude: zone.position.longitude,
            }));
        }
        if self.zones.contains_key(&zone.id) {
            return Err(ScenarioError::DuplicateId(zone.id.to_string()));
        }
        let id = zone.id;
        self.ids.observe_zone(id);
        self.zones.insert(id, zone);
        Ok(id)
    }

    pub fn insert_incident(&mut self, incident: IncidentType) -> Result<IncidentId> {
        self.check_incident(&incident)?;
        if self.incidents.contains_key(&incident.id) {
            return Err(ScenarioError::DuplicateId(incident.id.to_string()));
        }
        let id = incident.id;
        self.ids.observe_incident(id);
        self.incidents.insert(id, incident);
        Ok(id)
    }

    fn check_incident(&self, incident: &IncidentType) -> Result<()> {
        if incident.permitted.is_empty() {
            return Err(ScenarioError::NoPermittedVessel(incident.id));
        }
        if let Some(v) = incident.permitted.iter().find(|v| !self.vessels.contains_key(v)) {
            return Err(ScenarioError::UnknownVessel(*v));
        }
        for (zone, p) in &incident.probability_by_zone {
            if !self.zones.contains_key(zone) {
                return Err(ScenarioError::UnknownZone(*zone));
            }
            if !(0.0..=1.0).contains(p) {
                return Err(ScenarioError::InvalidIncident {
                    id: incident.id,
                    reason: format!("probability {p} in {zone} outside [0, 1]"),
                });
            }
        }
        if !(incident.weight.is_finite() && incident.weight >= 0.0) {
            return Err(ScenarioError::InvalidIncident {
                id: incident.id,
                reason: format!("weight must be non-negative, got {}", incident.weight),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entity access
    // ------------------------------------------------------------------

    pub fn vessels(&self) -> impl Iterator<Item = &VesselType> {
        self.vessels.values()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn incidents(&self) -> impl Iterator<Item = &IncidentType> {
        self.incidents.values()
    }

    pub fn vessel(&self, id: VesselId) -> Result<&VesselType> {
        self.vessels.get(&id).ok_or(ScenarioError::UnknownVessel(id))
    }

    pub fn station(&self, id: StationId) -> Result<&Station> {
        self.stations.get(&id).ok_or(ScenarioError::UnknownStation(id))
    }

    pub fn zone(&self, id: ZoneId) -> Result<&Zone> {
        self.zones.get(&id).ok_or(ScenarioError::UnknownZone(id))
    }

    pub fn incident(&self, id: IncidentId) -> Result<&IncidentType> {
        self.incidents.get(&id).ok_or(ScenarioError::UnknownIncident(id))
    }

    pub fn vessel_count(&self) -> usize {
        self.vessels.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }

    /// Total number of vessels over all vessel types
    pub fn total_fleet(&self) -> u64 {
        self.vessels.values().map(|v| u64::from(v.fleet_size)).sum()
    }

    /// Store a derived availability threshold, clamped to [0, 1]
    pub fn set_min_availability(&mut self, station: StationId, threshold: f64) -> Result<()> {
        let s = self
            .stations
            .get_mut(&station)
            .ok_or(ScenarioError::UnknownStation(station))?;
        s.min_availability = if threshold.is_nan() { 1.0 } else { threshold.clamp(0.0, 1.0) };
        Ok(())
    }

    /// Drop every station not matching `keep`, together with its relations
    pub fn retain_stations(&mut self, mut keep: impl FnMut(&Station) -> bool) {
        self.stations.retain(|_, s| keep(s));
        let stations = &self.stations;
        self.allowed.retain(|(s, _)| stations.contains_key(s));
        self.reachable.retain(|(_, s, _)| stations.contains_key(s));
    }

    // ------------------------------------------------------------------
    // Allowance relation
    // ------------------------------------------------------------------

    pub fn allow(&mut self, station: StationId, vessel: VesselId) -> Result<()> {
        self.station(station)?;
        self.vessel(vessel)?;
        self.allowed.insert((station, vessel));
        Ok(())
    }

    pub fn is_allowed(&self, station: StationId, vessel: VesselId) -> bool {
        self.allowed.contains(&(station, vessel))
    }

    pub fn allowed_vessels(&self, station: StationId) -> impl Iterator<Item = VesselId> + '_ {
        self.allowed
            .range((station, VesselId(0))..=(station, VesselId(u32::MAX)))
            .map(|&(_, v)| v)
    }

    pub fn allowed_stations(&self, vessel: VesselId) -> impl Iterator<Item = StationId> + '_ {
        self.allowed
            .iter()
            .filter(move |&&(_, v)| v == vessel)
            .map(|&(s, _)| s)
    }

    pub fn allowed_pairs(&self) -> impl Iterator<Item = (StationId, VesselId)> + '_ {
        self.allowed.iter().copied()
    }

    /// Give every station without an allowed vessel the `fallback` type
    ///
    /// Returns the number of repaired stations.
    pub fn ensure_station_allowances(&mut self, fallback: VesselId) -> Result<usize> {
        self.vessel(fallback)?;
        let orphans: Vec<StationId> = self
            .stations
            .keys()
            .copied()
            .filter(|&s| self.allowed_vessels(s).next().is_none())
            .collect();
        for &station in &orphans {
            warn!(
                "Station {} had no allowed vessel, assigning {} as default",
                station, fallback
            );
            self.allowed.insert((station, fallback));
        }
        Ok(orphans.len())
    }

    // ------------------------------------------------------------------
    // Reachability relation
    // ------------------------------------------------------------------

    /// Memoized great-circle distance in nautical miles
    pub fn distance_nm(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        self.distances.distance_nm(a, b)
    }

    /// Rebuild the reachability table from scratch for the current zones
    pub fn compute_reachability(&mut self) {
        let mut reachable = BTreeSet::new();
        for zone in self.zones.values() {
            for station in self.stations.values() {
                let dist = self.distances.distance_nm(&zone.position, &station.position);
                for vessel in self.vessels.values() {
                    if vessel.reaches(dist) {
                        reachable.insert((zone.id, station.id, vessel.id));
                    }
                }
            }
        }
        debug!(
            "Computed {} reachable (zone, station, vessel) triples",
            reachable.len()
        );
        self.reachable = reachable;
    }

    pub fn can_reach(&self, zone: ZoneId, station: StationId, vessel: VesselId) -> bool {
        self.reachable.contains(&(zone, station, vessel))
    }

    pub fn reachable_pairs(&self, zone: ZoneId) -> impl Iterator<Item = (StationId, VesselId)> + '_ {
        self.reachable
            .range((zone, StationId(0), VesselId(0))..=(zone, StationId(u32::MAX), VesselId(u32::MAX)))
            .map(|&(_, s, v)| (s, v))
    }

    pub(crate) fn mark_reachable(&mut self, zone: ZoneId, station: StationId, vessel: VesselId) -> Result<()> {
        self.zone(zone)?;
        self.station(station)?;
        self.vessel(vessel)?;
        self.reachable.insert((zone, station, vessel));
        Ok(())
    }

    /// Swap the zone set, remap incident probabilities and recompute reachability
    pub fn replace_zones(
        &mut self,
        zones: Vec<Zone>,
        mut probabilities: BTreeMap<IncidentId, BTreeMap<ZoneId, f64>>,
    ) -> Result<()> {
        self.zones.clear();
        self.reachable.clear();
        for zone in zones {
            self.insert_zone(zone)?;
        }

        let ids: Vec<IncidentId> = self.incidents.keys().copied().collect();
        for id in ids {
            let by_zone = probabilities.remove(&id).unwrap_or_default();
            if let Some(z) = by_zone.keys().find(|z| !self.zones.contains_key(z)) {
                return Err(ScenarioError::UnknownZone(*z));
            }
            if let Some(incident) = self.incidents.get_mut(&id) {
                incident.probability_by_zone = by_zone;
            }
        }

        self.compute_reachability();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    /// Check the invariants a coverage model relies on
    pub fn validate(&self) -> Result<()> {
        if let Some(s) = self
            .stations
            .keys()
            .find(|&&s| self.allowed_vessels(s).next().is_none())
        {
            return Err(ScenarioError::StationWithoutVessel(*s));
        }
        for incident in self.incidents.values() {
            self.check_incident(incident)?;
            if let Some(z) = self
                .zones
                .keys()
                .find(|z| !incident.probability_by_zone.contains_key(z))
            {
                return Err(ScenarioError::MissingProbability {
                    incident: incident.id,
                    zone: *z,
                });
            }
        }
        Ok(())
    }
}
