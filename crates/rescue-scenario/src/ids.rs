//! Entity identifiers
//!
//! Identifiers are issued per entity kind by an [`IdIssuer`] owned by the
//! scenario under construction, so two scenarios built in the same process
//! never share counters.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`crate::VesselType`]
    VesselId,
    "V"
);
entity_id!(
    /// Identifier of a [`crate::Station`]
    StationId,
    "S"
);
entity_id!(
    /// Identifier of a [`crate::Zone`]
    ZoneId,
    "Z"
);
entity_id!(
    /// Identifier of an [`crate::IncidentType`]
    IncidentId,
    "I"
);

/// Monotonic identifier source, one counter per entity kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdIssuer {
    next_vessel: u32,
    next_station: u32,
    next_zone: u32,
    next_incident: u32,
}

impl IdIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vessel(&mut self) -> VesselId {
        VesselId(bump(&mut self.next_vessel))
    }

    pub fn station(&mut self) -> StationId {
        StationId(bump(&mut self.next_station))
    }

    pub fn zone(&mut self) -> ZoneId {
        ZoneId(bump(&mut self.next_zone))
    }

    pub fn incident(&mut self) -> IncidentId {
        IncidentId(bump(&mut self.next_incident))
    }

    /// Record an externally supplied identifier so later issues never collide with it
    pub fn observe_vessel(&mut self, id: VesselId) {
        self.next_vessel = self.next_vessel.max(id.0 + 1);
    }

    pub fn observe_station(&mut self, id: StationId) {
        self.next_station = self.next_station.max(id.0 + 1);
    }

    pub fn observe_zone(&mut self, id: ZoneId) {
        self.next_zone = self.next_zone.max(id.0 + 1);
    }

    pub fn observe_incident(&mut self, id: IncidentId) {
        self.next_incident = self.next_incident.max(id.0 + 1);
    }
}

fn bump(counter: &mut u32) -> u32 {
    let id = *counter;
    *counter += 1;
    id
}
