//! Fleet data loading from JSON files
//!
//! Stations and vessel classes come from scraped fleet listings with
//! optional fields. Entries without coordinates or speed are skipped;
//! vessel entries of the same class are merged into one type whose fleet
//! size is the sum of their amounts.

use crate::{PlannerError, Result};
use rescue_scenario::{Capability, GeoPoint, IdIssuer, Station, VesselType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Validate latitude is in valid range
fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

/// Validate longitude is in valid range
fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}

/// Callsigns are written without blanks
fn normalize_callsign(callsign: String) -> String {
    callsign.trim().replace(' ', "_")
}

/// Raw station from JSON
#[derive(Debug, Deserialize)]
struct RawStation {
    name: Option<String>,
    callsign: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    depth_m: Option<f64>,
}

/// Speed/range pair from a vessel's range table
#[derive(Debug, Deserialize)]
struct RawRange {
    range: f64,
}

/// Raw vessel from JSON
#[derive(Debug, Deserialize)]
struct RawVessel {
    name: Option<String>,
    class: Option<String>,
    speed_knots: Option<f64>,
    draught_m: Option<f64>,
    amount: Option<u32>,
    #[serde(default)]
    range: Vec<RawRange>,
    #[serde(default)]
    tools: BTreeMap<String, Capability>,
}

fn open_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Load stations from JSON file
pub fn load_stations(path: impl AsRef<Path>, ids: &mut IdIssuer) -> Result<Vec<Station>> {
    let path = path.as_ref();
    info!("Loading stations from {:?}", path);
    let raw: Vec<RawStation> = open_json(path)?;

    let mut stations = Vec::new();
    let mut skipped = 0;

    for (i, entry) in raw.into_iter().enumerate() {
        let (lat, lon) = match (entry.latitude, entry.longitude) {
            (Some(lat), Some(lon)) if is_valid_latitude(lat) && is_valid_longitude(lon) => (lat, lon),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let name = entry.name.unwrap_or_else(|| format!("station-{}", i));
        let callsign = match entry.callsign {
            Some(c) => normalize_callsign(c),
            None => {
                debug!("No callsign available for {}", name);
                String::new()
            }
        };

        let mut station = Station::new(ids.station(), GeoPoint::new(lat, lon))
            .with_name(name)
            .with_callsign(callsign);
        if let Some(depth) = entry.depth_m.filter(|d| d.is_finite()) {
            station = station.with_depth(depth);
        }
        stations.push(station);
    }

    info!(
        "Loaded {} stations ({} skipped for missing coords)",
        stations.len(),
        skipped
    );
    if stations.is_empty() {
        return Err(PlannerError::EmptyFleet("stations"));
    }
    Ok(stations)
}

/// Load vessel types from JSON file, merging entries of the same class
pub fn load_vessels(path: impl AsRef<Path>, ids: &mut IdIssuer) -> Result<Vec<VesselType>> {
    let path = path.as_ref();
    info!("Loading vessel classes from {:?}", path);
    let raw: Vec<RawVessel> = open_json(path)?;
    let entries = raw.len();

    let mut by_class: BTreeMap<String, VesselType> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut skipped = 0;

    for (i, entry) in raw.into_iter().enumerate() {
        let speed = match entry.speed_knots {
            Some(s) if s.is_finite() && s > 0.0 => s,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let name = entry.name.unwrap_or_else(|| format!("vessel-{}", i));
        let class = entry.class.unwrap_or_else(|| name.clone());
        let amount = entry.amount.unwrap_or(1);

        if let Some(existing) = by_class.get_mut(&class) {
            existing.fleet_size += amount;
            continue;
        }

        // the longest listed range wins; no table means unknown reach
        let reach = entry.range.iter().map(|r| r.range).fold(-1.0_f64, f64::max);
        let mut vessel = VesselType::new(ids.vessel(), amount, speed)
            .with_name(class.clone())
            .with_reach(reach);
        match entry.draught_m.filter(|d| d.is_finite()) {
            Some(draught) => vessel = vessel.with_draught(draught),
            None => warn!("No draught for {} found", class),
        }
        for (tool, capability) in entry.tools {
            vessel = vessel.with_capability(tool, capability);
        }
        order.push(class.clone());
        by_class.insert(class, vessel);
    }

    let vessels: Vec<VesselType> = order.into_iter().filter_map(|c| by_class.remove(&c)).collect();
    info!(
        "Loaded {} vessel types from {} entries ({} skipped without speed)",
        vessels.len(),
        entries,
        skipped
    );
    if vessels.is_empty() {
        return Err(PlannerError::EmptyFleet("vessel types"));
    }
    Ok(vessels)
}

/// Stations and vessel types with identifiers from one issuer
pub fn load_fleet(
    stations_path: impl AsRef<Path>,
    vessels_path: impl AsRef<Path>,
) -> Result<(Vec<Station>, Vec<VesselType>)> {
    let mut ids = IdIssuer::new();
    let vessels = load_vessels(vessels_path, &mut ids)?;
    let stations = load_stations(stations_path, &mut ids)?;
    Ok((stations, vessels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_json(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_stations() {
        let file = temp_json(
            r#"[
                {"name": "Helgoland", "callsign": "Hermann Marwede", "latitude": 54.178, "longitude": 7.889, "depth_m": 3.2},
                {"name": "No Coords"},
                {"name": "Bad Lat", "latitude": 123.0, "longitude": 8.0}
            ]"#,
        );
        let mut ids = IdIssuer::new();
        let stations = load_stations(file.path(), &mut ids).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].callsign, "Hermann_Marwede");
        assert_eq!(stations[0].draft_depth_m, Some(3.2));
    }

    #[test]
    fn test_load_vessels_merges_classes() {
        let file = temp_json(
            r#"[
                {"name": "Vormann Jantzen", "class": "23m", "speed_knots": 22.0, "draught_m": 1.3,
                 "range": [{"speed": 10, "range": 300}, {"speed": 22, "range": 180}],
                 "tools": {"firefighting": true, "towing": 0.4}},
                {"name": "Hans Dittmer", "class": "23m", "speed_knots": 22.0, "amount": 2},
                {"name": "Broken", "class": "x"},
                {"name": "Verena", "class": "9m", "speed_knots": 18.0}
            ]"#,
        );
        let mut ids = IdIssuer::new();
        let vessels = load_vessels(file.path(), &mut ids).unwrap();
        assert_eq!(vessels.len(), 2);

        let big = &vessels[0];
        assert_eq!(big.name, "23m");
        assert_eq!(big.fleet_size, 3);
        assert_eq!(big.reach_nm, 300.0);
        assert!(big.has_capability("firefighting"));
        assert_eq!(big.capability_rating("towing"), 0.4);

        let small = &vessels[1];
        assert_eq!(small.reach_nm, -1.0);
        assert_eq!(small.draught_m, None);
        assert_ne!(small.id, big.id);
    }

    #[test]
    fn test_empty_fleet_is_error() {
        let file = temp_json("[]");
        let mut ids = IdIssuer::new();
        assert!(matches!(
            load_stations(file.path(), &mut ids),
            Err(PlannerError::EmptyFleet("stations"))
        ));
    }
}
