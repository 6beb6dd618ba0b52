//! Share artifact store
//!
//! Per water body, `<root>/<water>/` holds `shares.json`, `stations.json`
//! and `vessels.json` as tagged records. The directory is written once;
//! if any of the three files is missing the artifacts are recomputed.
//! Existing files that fail to parse are an error, never a recompute.

use crate::gauge::{load_catalogue, LockstepReader};
use crate::progress::Progress;
use crate::scan::ShareScanner;
use crate::shares::JointShares;
use crate::Result;
use rescue_scenario::codec::{self, Record, StationRecord};
use rescue_scenario::{Scenario, Station, VesselType, Water};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SHARES_FILE: &str = "shares.json";
pub const STATIONS_FILE: &str = "stations.json";
pub const VESSELS_FILE: &str = "vessels.json";

/// Joint shares plus the stations and vessel types they were computed for
#[derive(Debug, Clone, PartialEq)]
pub struct ShareArtifacts {
    pub shares: JointShares,
    pub stations: Vec<Station>,
    pub vessels: Vec<VesselType>,
}

impl ShareArtifacts {
    /// A scenario holding these vessels and stations, with no relations yet
    pub fn to_scenario(&self) -> Result<Scenario> {
        let mut scenario = Scenario::new();
        for vessel in &self.vessels {
            scenario.insert_vessel(vessel.clone())?;
        }
        for station in &self.stations {
            scenario.insert_station(station.clone())?;
        }
        Ok(scenario)
    }
}

/// Scan the gauge series of `water` for the stations lying in it
pub fn compute_artifacts(
    gauge_root: &Path,
    water: Water,
    stations: Vec<Station>,
    vessels: Vec<VesselType>,
    progress: &mut dyn Progress,
) -> Result<ShareArtifacts> {
    let total = stations.len();
    let stations: Vec<Station> = stations
        .into_iter()
        .filter(|s| water.contains_longitude(s.position.longitude))
        .collect();
    info!("{} of {} stations lie in {}", stations.len(), total, water);

    let gauges = load_catalogue(gauge_root, water)?;
    let scanner = ShareScanner::new(&stations, &vessels, &gauges);
    let mut reader = LockstepReader::open(gauge_root, &gauges)?;
    let shares = scanner.scan(&mut reader, progress)?;

    Ok(ShareArtifacts {
        shares,
        stations,
        vessels,
    })
}

#[derive(Debug, Clone)]
pub struct ShareStore {
    root: PathBuf,
}

impl ShareStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, water: Water) -> PathBuf {
        self.root.join(water.dir_name())
    }

    pub fn is_cached(&self, water: Water) -> bool {
        let dir = self.dir(water);
        [SHARES_FILE, STATIONS_FILE, VESSELS_FILE]
            .iter()
            .all(|f| dir.join(f).exists())
    }

    pub fn load(&self, water: Water) -> Result<ShareArtifacts> {
        let dir = self.dir(water);
        info!("Reading share artifacts from {:?}", dir);

        let vessels = codec::decode_vessels(codec::load_records(dir.join(VESSELS_FILE))?)?;
        let stations: Vec<Station> = codec::decode_stations(codec::load_records(dir.join(STATIONS_FILE))?)?
            .into_iter()
            .map(|(station, _)| station)
            .collect();
        let records = codec::decode_shares(codec::load_records(dir.join(SHARES_FILE))?)?;

        let station_ids: BTreeSet<_> = stations.iter().map(|s| s.id).collect();
        let vessel_ids: BTreeSet<_> = vessels.iter().map(|v| v.id).collect();
        let shares = JointShares::from_records(records, &station_ids, &vessel_ids)?;
        info!(
            "Loaded {} share combinations, {} stations, {} vessel types",
            shares.len(),
            stations.len(),
            vessels.len()
        );

        Ok(ShareArtifacts {
            shares,
            stations,
            vessels,
        })
    }

    pub fn save(&self, water: Water, artifacts: &ShareArtifacts) -> Result<()> {
        let dir = self.dir(water);
        fs::create_dir_all(&dir)?;
        info!("Writing share artifacts to {:?}", dir);

        let shares: Vec<Record> = artifacts.shares.to_records().into_iter().map(Record::Share).collect();
        let stations: Vec<Record> = artifacts
            .stations
            .iter()
            .map(|s| Record::Station(StationRecord::from_station(s, Vec::new())))
            .collect();
        let vessels = codec::vessel_records(&artifacts.vessels);

        codec::save_records(dir.join(SHARES_FILE), &shares)?;
        codec::save_records(dir.join(STATIONS_FILE), &stations)?;
        codec::save_records(dir.join(VESSELS_FILE), &vessels)?;
        Ok(())
    }

    /// Cached artifacts when all three files exist, otherwise `compute` and persist
    pub fn load_or_compute<F>(&self, water: Water, compute: F) -> Result<ShareArtifacts>
    where
        F: FnOnce() -> Result<ShareArtifacts>,
    {
        if self.is_cached(water) {
            return self.load(water);
        }
        info!("No cached shares for {}, computing", water);
        let artifacts = compute()?;
        self.save(water, &artifacts)?;
        Ok(artifacts)
    }
}
