//! Procedural scenario assembly
//!
//! Fills the late-bound parts of a scenario whose vessels and stations are
//! already loaded: station allowances, zones, reachability and incident
//! types. Every random draw comes from one seeded [`StdRng`], so the same
//! seed and inputs always produce the same scenario.

use crate::entities::{IncidentType, Zone};
use crate::ids::{VesselId, ZoneId};
use crate::registry::Scenario;
use crate::zones::Bounds;
use crate::{Result, ScenarioError};
use coastal_geo::GeoPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Capability names that each yield one incident type
pub const BOOLEAN_INCIDENTS: [&str; 5] = [
    "firefighting",
    "pumping",
    "second_craft",
    "first_aid",
    "board_hospital",
];

/// Capability whose numeric rating gates the towing incidents
pub const TOWING: &str = "towing";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Probability that a given vessel type is allowed at a given station
    pub allowance_p: f64,
    /// Number of towing incident types
    pub tow_amount: usize,
    /// Probability that an incident type occurs in a given zone at all
    pub zone_p: f64,
    /// Margin added around the station bounding box for raster zones
    pub oversize: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            allowance_p: 0.9,
            tow_amount: 10,
            zone_p: 0.4,
            oversize: 0.2,
        }
    }
}

/// Where zone centroids come from
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneSource {
    /// Pre-sampled centroids
    Points(Vec<GeoPoint>),
    /// A raster of about this many zones over the stations
    Raster { max_zones: usize },
}

pub struct ScenarioGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl ScenarioGenerator {
    pub fn new(seed: u64, config: GeneratorConfig) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(seed, GeneratorConfig::default())
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// True with probability `p`, in whole percent steps
    fn random_bool(&mut self, p: f64) -> bool {
        let value: u32 = self.rng.gen_range(0..=100);
        f64::from(value) < p * 100.0
    }

    /// Uniform draw in `[min, max]` rounded to four decimals
    fn random_p(&mut self, min: f64, max: f64) -> f64 {
        let value: f64 = self.rng.gen();
        let scaled = min + value * (max - min);
        (scaled * 10_000.0).round() / 10_000.0
    }

    /// Run every assembly step in pipeline order
    pub fn populate(&mut self, scenario: &mut Scenario, zones: ZoneSource) -> Result<()> {
        info!("Creating vessel station allowances");
        self.random_allowances(scenario)?;

        match zones {
            ZoneSource::Points(points) => {
                add_zones(scenario, points)?;
            }
            ZoneSource::Raster { max_zones } => {
                warn!(
                    "No zone file given, rastering the station area. \
                     Raster zones include land cells and will likely make the model infeasible"
                );
                self.raster_zones(scenario, max_zones)?;
            }
        }
        info!("Scenario has {} zones", scenario.zone_count());

        scenario.compute_reachability();

        info!("Creating incident types");
        self.random_incidents(scenario)?;
        Ok(())
    }

    /// Allow each (station, vessel) pair with probability `allowance_p`
    ///
    /// Stations left without a vessel receive the first vessel type.
    /// Returns the number of stations that had to be repaired.
    pub fn random_allowances(&mut self, scenario: &mut Scenario) -> Result<usize> {
        let vessels: Vec<VesselId> = scenario.vessels().map(|v| v.id).collect();
        let fallback = *vessels
            .first()
            .ok_or_else(|| ScenarioError::Generation("no vessel types loaded".to_string()))?;
        let stations: Vec<_> = scenario.stations().map(|s| s.id).collect();

        let p = self.config.allowance_p;
        let draws: Vec<Vec<bool>> = stations
            .iter()
            .map(|_| vessels.iter().map(|_| self.random_bool(p)).collect())
            .collect();

        for (station, row) in stations.iter().zip(&draws) {
            for (vessel, allowed) in vessels.iter().zip(row) {
                if *allowed {
                    scenario.allow(*station, *vessel)?;
                }
            }
        }
        scenario.ensure_station_allowances(fallback)
    }

    /// Raster zones over the enlarged station bounding box
    pub fn raster_zones(&mut self, scenario: &mut Scenario, max_zones: usize) -> Result<usize> {
        let positions: Vec<GeoPoint> = scenario.stations().map(|s| s.position).collect();
        let bounds = Bounds::around(&positions)
            .ok_or_else(|| ScenarioError::Generation("no stations to raster around".to_string()))?
            .enlarge(self.config.oversize);

        let cells = bounds.raster(max_zones);
        let count = cells.len();
        for cell in cells {
            let id = scenario.new_zone_id();
            scenario.insert_zone(Zone::new(id, cell.position).with_footprint(cell.width, cell.height))?;
        }
        Ok(count)
    }

    fn zone_probabilities(&mut self, zones: &[ZoneId]) -> BTreeMap<ZoneId, f64> {
        let zone_p = self.config.zone_p;
        let appears: Vec<bool> = zones.iter().map(|_| self.random_bool(zone_p)).collect();
        zones
            .iter()
            .zip(appears)
            .map(|(zone, appears)| {
                let p = if appears { self.random_p(0.0, 1.0) } else { 0.0 };
                (*zone, p)
            })
            .collect()
    }

    /// Capability incidents plus `tow_amount` towing incidents
    pub fn random_incidents(&mut self, scenario: &mut Scenario) -> Result<()> {
        let zones: Vec<ZoneId> = scenario.zones().map(|z| z.id).collect();

        let weights: Vec<f64> = BOOLEAN_INCIDENTS.iter().map(|_| self.random_p(0.0, 1.0)).collect();
        for (name, weight) in BOOLEAN_INCIDENTS.iter().zip(weights) {
            let id = scenario.new_incident_id();
            let mut incident = IncidentType::new(id, weight).with_name(*name);
            incident.permitted = scenario
                .vessels()
                .filter(|v| v.has_capability(name))
                .map(|v| v.id)
                .collect();
            incident.probability_by_zone = self.zone_probabilities(&zones);
            scenario.insert_incident(incident)?;
        }

        let tow_amount = self.config.tow_amount;
        let weights: Vec<f64> = (0..tow_amount).map(|_| self.random_p(0.0, 1.0)).collect();
        let max_rating = scenario
            .vessels()
            .map(|v| v.capability_rating(TOWING))
            .fold(0.0_f64, f64::max);
        for (k, weight) in weights.into_iter().enumerate() {
            let required = self.random_p(0.0, max_rating);
            let id = scenario.new_incident_id();
            let mut incident =
                IncidentType::new(id, weight / tow_amount as f64).with_name(format!("{}_{}", TOWING, k));
            incident.permitted = scenario
                .vessels()
                .filter(|v| v.capability_rating(TOWING) >= required)
                .map(|v| v.id)
                .collect();
            incident.probability_by_zone = self.zone_probabilities(&zones);
            debug!(
                "Towing incident {} requires rating {:.4}, {} vessel types qualify",
                id,
                required,
                incident.permitted.len()
            );
            scenario.insert_incident(incident)?;
        }
        Ok(())
    }
}

/// Insert one zone per centroid
pub fn add_zones(scenario: &mut Scenario, points: Vec<GeoPoint>) -> Result<usize> {
    let count = points.len();
    for position in points {
        let id = scenario.new_zone_id();
        scenario.insert_zone(Zone::new(id, position))?;
    }
    Ok(count)
}
