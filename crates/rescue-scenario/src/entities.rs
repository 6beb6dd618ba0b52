//! Domain entities
//!
//! Entities hold only their own attributes. Relations between them
//! (vessel ↔ station allowances, zone reachability) live in the
//! [`crate::Scenario`] relation tables.

use crate::ids::{IncidentId, StationId, VesselId, ZoneId};
use coastal_geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Equipment rating of a vessel: either present/absent or a numeric grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Capability {
    Flag(bool),
    Rating(f64),
}

impl Capability {
    pub fn is_present(&self) -> bool {
        match *self {
            Capability::Flag(b) => b,
            Capability::Rating(r) => r > 0.0,
        }
    }

    pub fn rating(&self) -> f64 {
        match *self {
            Capability::Flag(true) => 1.0,
            Capability::Flag(false) => 0.0,
            Capability::Rating(r) => r,
        }
    }
}

/// A class of rescue vessel and how many of them the fleet has
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselType {
    pub id: VesselId,
    #[serde(default)]
    pub name: String,
    pub fleet_size: u32,
    pub speed_knots: f64,
    /// Operational round-trip range; negative means unknown and is treated as unbounded
    pub reach_nm: f64,
    pub draught_m: Option<f64>,
    #[serde(default)]
    pub capabilities: BTreeMap<String, Capability>,
}

impl VesselType {
    pub fn new(id: VesselId, fleet_size: u32, speed_knots: f64) -> Self {
        Self {
            id,
            name: String::new(),
            fleet_size,
            speed_knots,
            reach_nm: -1.0,
            draught_m: None,
            capabilities: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_reach(mut self, reach_nm: f64) -> Self {
        self.reach_nm = reach_nm;
        self
    }

    pub fn with_draught(mut self, draught_m: f64) -> Self {
        self.draught_m = Some(draught_m);
        self
    }

    pub fn with_capability(mut self, name: impl Into<String>, capability: Capability) -> Self {
        self.capabilities.insert(name.into(), capability);
        self
    }

    /// Hours to cover `distance_nm` at full speed
    pub fn travel_time_h(&self, distance_nm: f64) -> f64 {
        distance_nm / self.speed_knots
    }

    /// A zone is within reach iff the one-way distance is at most half the round-trip range
    pub fn reaches(&self, distance_nm: f64) -> bool {
        self.reach_nm < 0.0 || distance_nm <= self.reach_nm / 2.0
    }

    pub fn capability(&self, name: &str) -> Option<Capability> {
        self.capabilities.get(name).copied()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capability(name).is_some_and(|c| c.is_present())
    }

    pub fn capability_rating(&self, name: &str) -> f64 {
        self.capability(name).map(|c| c.rating()).unwrap_or(0.0)
    }
}

/// A harbour a vessel can be stationed at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub callsign: String,
    pub position: GeoPoint,
    /// Fraction of time the station is assumed closed to every vessel, in [0, 1]
    pub min_availability: f64,
    /// Depth of the berth in metres
    pub draft_depth_m: Option<f64>,
}

impl Station {
    pub fn new(id: StationId, position: GeoPoint) -> Self {
        Self {
            id,
            name: String::new(),
            callsign: String::new(),
            position,
            min_availability: 0.0,
            draft_depth_m: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = callsign.into();
        self
    }

    pub fn with_depth(mut self, depth_m: f64) -> Self {
        self.draft_depth_m = Some(depth_m);
        self
    }

    pub fn with_min_availability(mut self, threshold: f64) -> Self {
        self.min_availability = threshold;
        self
    }
}

/// A sea area incidents can happen in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub position: GeoPoint,
    /// Footprint in degrees of longitude; zero after clustering
    #[serde(default)]
    pub width: f64,
    /// Footprint in degrees of latitude; zero after clustering
    #[serde(default)]
    pub height: f64,
}

impl Zone {
    pub fn new(id: ZoneId, position: GeoPoint) -> Self {
        Self {
            id,
            position,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn with_footprint(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// A kind of incident, who may respond to it and where it happens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentType {
    pub id: IncidentId,
    #[serde(default)]
    pub name: String,
    pub permitted: BTreeSet<VesselId>,
    pub probability_by_zone: BTreeMap<ZoneId, f64>,
    pub weight: f64,
}

impl IncidentType {
    pub fn new(id: IncidentId, weight: f64) -> Self {
        Self {
            id,
            name: String::new(),
            permitted: BTreeSet::new(),
            probability_by_zone: BTreeMap::new(),
            weight,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn permit(mut self, vessel: VesselId) -> Self {
        self.permitted.insert(vessel);
        self
    }

    pub fn with_probability(mut self, zone: ZoneId, probability: f64) -> Self {
        self.probability_by_zone.insert(zone, probability);
        self
    }

    /// Probability of this incident in `zone`; zero when the zone is not listed
    pub fn probability(&self, zone: ZoneId) -> f64 {
        self.probability_by_zone.get(&zone).copied().unwrap_or(0.0)
    }

    pub fn permits(&self, vessel: VesselId) -> bool {
        self.permitted.contains(&vessel)
    }
}
