//! Tagged-record persistence
//!
//! Every persisted object carries a `__dtype__` discriminator naming its
//! entity kind. Cross references (a station's allowed vessels, a zone's
//! reachable pairs, a share's open stations) are stored as identifiers and
//! resolved against the decoded entities, so dangling references fail the
//! decode instead of passing through.

use crate::entities::{IncidentType, Station, VesselType, Zone};
use crate::ids::{IncidentId, StationId, VesselId, ZoneId};
use crate::registry::Scenario;
use crate::{Result, ScenarioError};
use coastal_geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// One persisted object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__dtype__")]
pub enum Record {
    Vessel(VesselType),
    Station(StationRecord),
    Zone(ZoneRecord),
    #[serde(rename = "Incident_Type")]
    IncidentType(IncidentRecord),
    Share(ShareRecord),
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Vessel(_) => "Vessel",
            Record::Station(_) => "Station",
            Record::Zone(_) => "Zone",
            Record::IncidentType(_) => "Incident_Type",
            Record::Share(_) => "Share",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: StationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub callsign: String,
    pub position: GeoPoint,
    pub min_availability: f64,
    pub draft_depth_m: Option<f64>,
    #[serde(default)]
    pub allowed_vessels: Vec<VesselId>,
}

impl StationRecord {
    pub fn into_station(self) -> (Station, Vec<VesselId>) {
        let station = Station {
            id: self.id,
            name: self.name,
            callsign: self.callsign,
            position: self.position,
            min_availability: self.min_availability,
            draft_depth_m: self.draft_depth_m,
        };
        (station, self.allowed_vessels)
    }

    pub fn from_station(station: &Station, allowed_vessels: Vec<VesselId>) -> Self {
        Self {
            id: station.id,
            name: station.name.clone(),
            callsign: station.callsign.clone(),
            position: station.position,
            min_availability: station.min_availability,
            draft_depth_m: station.draft_depth_m,
            allowed_vessels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub id: ZoneId,
    pub position: GeoPoint,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub reachable_from_by: Vec<(StationId, VesselId)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: IncidentId,
    #[serde(default)]
    pub name: String,
    pub permitted: Vec<VesselId>,
    pub probability_by_zone: Vec<(ZoneId, f64)>,
    pub weight: f64,
}

/// One joint accessibility combination and the fraction of time it held
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub key: Vec<(StationId, Vec<VesselId>)>,
    pub value: f64,
}

fn unexpected(expected: &str, got: &Record) -> ScenarioError {
    ScenarioError::Codec(format!("expected {} record, found {}", expected, got.kind()))
}

// ----------------------------------------------------------------------
// Reading and writing
// ----------------------------------------------------------------------

pub fn read_records(reader: impl Read) -> Result<Vec<Record>> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_records(writer: impl Write, records: &[Record]) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    debug!("Reading records from {:?}", path);
    let file = File::open(path)?;
    read_records(BufReader::new(file))
}

pub fn save_records(path: impl AsRef<Path>, records: &[Record]) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing {} records to {:?}", records.len(), path);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

// ----------------------------------------------------------------------
// Typed decoding
// ----------------------------------------------------------------------

pub fn vessel_records<'a>(vessels: impl IntoIterator<Item = &'a VesselType>) -> Vec<Record> {
    vessels.into_iter().cloned().map(Record::Vessel).collect()
}

pub fn decode_vessels(records: Vec<Record>) -> Result<Vec<VesselType>> {
    records
        .into_iter()
        .map(|r| match r {
            Record::Vessel(v) => Ok(v),
            other => Err(unexpected("Vessel", &other)),
        })
        .collect()
}

pub fn decode_stations(records: Vec<Record>) -> Result<Vec<(Station, Vec<VesselId>)>> {
    records
        .into_iter()
        .map(|r| match r {
            Record::Station(s) => Ok(s.into_station()),
            other => Err(unexpected("Station", &other)),
        })
        .collect()
}

pub fn decode_shares(records: Vec<Record>) -> Result<Vec<ShareRecord>> {
    records
        .into_iter()
        .map(|r| match r {
            Record::Share(s) => Ok(s),
            other => Err(unexpected("Share", &other)),
        })
        .collect()
}

impl Scenario {
    /// Station records carrying the current allowances
    pub fn station_records(&self) -> Vec<Record> {
        self.stations()
            .map(|s| Record::Station(StationRecord::from_station(s, self.allowed_vessels(s.id).collect())))
            .collect()
    }

    pub fn vessel_records(&self) -> Vec<Record> {
        vessel_records(self.vessels())
    }

    /// The whole entity graph as records
    pub fn to_records(&self) -> Vec<Record> {
        let mut records = self.vessel_records();
        records.extend(self.station_records());
        records.extend(self.zones().map(|z| {
            Record::Zone(ZoneRecord {
                id: z.id,
                position: z.position,
                width: z.width,
                height: z.height,
                reachable_from_by: self.reachable_pairs(z.id).collect(),
            })
        }));
        records.extend(self.incidents().map(|i| {
            Record::IncidentType(IncidentRecord {
                id: i.id,
                name: i.name.clone(),
                permitted: i.permitted.iter().copied().collect(),
                probability_by_zone: i.probability_by_zone.iter().map(|(z, p)| (*z, *p)).collect(),
                weight: i.weight,
            })
        }));
        records
    }

    /// Rebuild a scenario from records in any order
    pub fn from_records(records: Vec<Record>) -> Result<Scenario> {
        let mut vessels = Vec::new();
        let mut stations = Vec::new();
        let mut zones = Vec::new();
        let mut incidents = Vec::new();
        for record in records {
            match record {
                Record::Vessel(v) => vessels.push(v),
                Record::Station(s) => stations.push(s),
                Record::Zone(z) => zones.push(z),
                Record::IncidentType(i) => incidents.push(i),
                Record::Share(_) => {
                    return Err(ScenarioError::Codec(
                        "share records do not belong to a scenario".to_string(),
                    ))
                }
            }
        }

        let mut scenario = Scenario::new();
        for v in vessels {
            scenario.insert_vessel(v)?;
        }

        let mut allowances = Vec::new();
        for s in stations {
            let (station, allowed) = s.into_station();
            let id = scenario.insert_station(station)?;
            allowances.extend(allowed.into_iter().map(|v| (id, v)));
        }
        for (station, vessel) in allowances {
            scenario.allow(station, vessel)?;
        }

        let mut reachability = Vec::new();
        for z in zones {
            let id = scenario.insert_zone(Zone::new(z.id, z.position).with_footprint(z.width, z.height))?;
            reachability.extend(z.reachable_from_by.into_iter().map(|(s, v)| (id, s, v)));
        }
        for (zone, station, vessel) in reachability {
            scenario.mark_reachable(zone, station, vessel)?;
        }

        for i in incidents {
            scenario.insert_incident(IncidentType {
                id: i.id,
                name: i.name,
                permitted: i.permitted.into_iter().collect(),
                probability_by_zone: i.probability_by_zone.into_iter().collect(),
                weight: i.weight,
            })?;
        }

        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Capability;

    fn sample() -> Scenario {
        let mut sc = Scenario::new();
        let v0 = sc.new_vessel_id();
        sc.insert_vessel(
            VesselType::new(v0, 2, 23.0)
                .with_name("46m class")
                .with_reach(400.0)
                .with_draught(2.8)
                .with_capability("firefighting", Capability::Flag(true))
                .with_capability("towing", Capability::Rating(3.0)),
        )
        .unwrap();
        let v1 = sc.new_vessel_id();
        sc.insert_vessel(VesselType::new(v1, 5, 18.0).with_reach(60.0)).unwrap();

        let s0 = sc.new_station_id();
        sc.insert_station(
            Station::new(s0, GeoPoint::new(53.87, 8.69))
                .with_name("Cuxhaven")
                .with_callsign("DCUX")
                .with_depth(6.5)
                .with_min_availability(0.25),
        )
        .unwrap();
        let s1 = sc.new_station_id();
        sc.insert_station(Station::new(s1, GeoPoint::new(54.18, 7.89)).with_depth(4.0))
            .unwrap();
        sc.allow(s0, v0).unwrap();
        sc.allow(s0, v1).unwrap();
        sc.allow(s1, v1).unwrap();

        let z0 = sc.new_zone_id();
        sc.insert_zone(Zone::new(z0, GeoPoint::new(54.0, 8.2)).with_footprint(0.1, 0.05))
            .unwrap();
        sc.compute_reachability();

        let i0 = sc.new_incident_id();
        sc.insert_incident(
            IncidentType::new(i0, 0.7)
                .with_name("firefighting")
                .permit(v0)
                .with_probability(z0, 0.3),
        )
        .unwrap();
        sc
    }

    #[test]
    fn test_scenario_round_trip_resolves_references() {
        let original = sample();
        let json = serde_json::to_string(&original.to_records()).unwrap();
        let records: Vec<Record> = serde_json::from_str(&json).unwrap();
        let restored = Scenario::from_records(records).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_records_carry_discriminator() {
        let records = sample().station_records();
        let value = serde_json::to_value(&records).unwrap();
        assert_eq!(value[0]["__dtype__"], "Station");
        assert_eq!(value[0]["allowed_vessels"], serde_json::json!([0, 1]));
    }

    #[test]
    fn test_unknown_discriminator_is_rejected() {
        let json = r#"[{"__dtype__": "Lighthouse", "id": 3}]"#;
        assert!(serde_json::from_str::<Vec<Record>>(json).is_err());
    }

    #[test]
    fn test_wrong_record_kind_is_rejected() {
        let records = sample().station_records();
        let err = decode_vessels(records).unwrap_err();
        assert!(matches!(err, ScenarioError::Codec(_)));
    }

    #[test]
    fn test_dangling_allowance_fails_decode() {
        let mut records = sample().station_records();
        if let Record::Station(s) = &mut records[0] {
            s.allowed_vessels.push(VesselId(42));
        }
        // vessels are missing entirely, so the first allowance already dangles
        let err = Scenario::from_records(records).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownVessel(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vessels.json");
        let original = sample();
        save_records(&path, &original.vessel_records()).unwrap();

        let vessels = decode_vessels(load_records(&path).unwrap()).unwrap();
        assert_eq!(vessels, original.vessels().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn test_share_record_shape() {
        let record = Record::Share(ShareRecord {
            key: vec![(StationId(0), vec![VesselId(1), VesselId(2)])],
            value: 0.25,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"__dtype__": "Share", "key": [[0, [1, 2]]], "value": 0.25})
        );
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
