//! Joint share scan
//!
//! For each gauge row every station's water level is interpolated from
//! its nearest gauges that have a reading, the berth depth is subtracted,
//! and the vessel types whose draught is below the clearance are open
//! there. Identical combinations are counted over all rows.

use crate::gauge::{Gauge, GaugeFrame, LockstepReader};
use crate::progress::Progress;
use crate::shares::{Combination, JointShares};
use crate::{Result, TidalError};
use rescue_scenario::{Station, StationId, VesselId, VesselType};
use std::collections::BTreeMap;
use std::io::BufRead;
use tracing::{debug, info};

/// Gauges contributing to one station's interpolated level
pub const GAUGES_PER_STATION: usize = 3;

/// Inverse-distance weighted level
///
/// Each reading is weighted by the sum of all distances minus its own.
/// When the weights vanish (a single reading, or all at distance zero)
/// the plain mean is used.
pub fn interpolate(readings: &[(f64, f64)]) -> Option<f64> {
    if readings.is_empty() {
        return None;
    }
    let total: f64 = readings.iter().map(|(_, d)| d).sum();
    let weights: f64 = readings.iter().map(|(_, d)| total - d).sum();
    if weights > 0.0 {
        Some(readings.iter().map(|(l, d)| l * (total - d)).sum::<f64>() / weights)
    } else {
        Some(readings.iter().map(|(l, _)| l).sum::<f64>() / readings.len() as f64)
    }
}

#[derive(Debug, Clone)]
struct StationSite {
    id: StationId,
    depth_cm: f64,
    /// (gauge index, distance in nm), nearest first
    gauges: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
pub struct ShareScanner {
    sites: Vec<StationSite>,
    /// (vessel, draught in cm), a missing draught counts as zero
    draughts: Vec<(VesselId, f64)>,
    gauge_count: usize,
}

impl ShareScanner {
    /// Stations without a berth depth are left out and never open
    pub fn new(stations: &[Station], vessels: &[VesselType], gauges: &[Gauge]) -> Self {
        let sites = stations
            .iter()
            .filter_map(|station| {
                let depth = match station.draft_depth_m {
                    Some(d) => d,
                    None => {
                        debug!("Station {} has no depth, treating as never open", station.id);
                        return None;
                    }
                };
                let mut order: Vec<(usize, f64)> = gauges
                    .iter()
                    .enumerate()
                    .map(|(i, g)| (i, station.position.distance_nm(&g.position)))
                    .collect();
                order.sort_by(|a, b| a.1.total_cmp(&b.1));
                Some(StationSite {
                    id: station.id,
                    depth_cm: depth * 100.0,
                    gauges: order,
                })
            })
            .collect();

        let mut draughts: Vec<(VesselId, f64)> = vessels
            .iter()
            .map(|v| (v.id, v.draught_m.unwrap_or(0.0) * 100.0))
            .collect();
        draughts.sort_by_key(|(id, _)| *id);

        Self {
            sites,
            draughts,
            gauge_count: gauges.len(),
        }
    }

    pub fn station_count(&self) -> usize {
        self.sites.len()
    }

    fn station_level(&self, site: &StationSite, levels: &[Option<f64>]) -> Option<f64> {
        let readings: Vec<(f64, f64)> = site
            .gauges
            .iter()
            .filter_map(|&(i, d)| levels.get(i).copied().flatten().map(|l| (l, d)))
            .take(GAUGES_PER_STATION)
            .collect();
        interpolate(&readings)
    }

    /// Open stations and fitting vessel types for one row
    pub fn open_combination(&self, frame: &GaugeFrame) -> Combination {
        let entries = self.sites.iter().filter_map(|site| {
            let level = self.station_level(site, &frame.levels)?;
            let clearance = level - site.depth_cm;
            let fitting: Vec<VesselId> = self
                .draughts
                .iter()
                .filter(|(_, draught)| *draught < clearance)
                .map(|(id, _)| *id)
                .collect();
            Some((site.id, fitting))
        });
        Combination::new(entries)
    }

    /// Count combinations over every row and normalize
    ///
    /// A row with no open station at all means corrupt input and fails.
    pub fn scan<R: BufRead>(
        &self,
        reader: &mut LockstepReader<R>,
        progress: &mut dyn Progress,
    ) -> Result<JointShares> {
        info!(
            "Scanning {} gauges for {} stations and {} vessel types",
            self.gauge_count,
            self.sites.len(),
            self.draughts.len()
        );
        let mut counts: BTreeMap<Combination, u64> = BTreeMap::new();
        let mut rows = 0;
        while let Some(frame) = reader.next_frame()? {
            let combination = self.open_combination(&frame);
            if combination.is_empty() {
                return Err(TidalError::NoStationOpen { row: frame.row });
            }
            *counts.entry(combination).or_insert(0) += 1;
            rows = frame.row;
            progress.advance(rows);
        }
        progress.finish(rows);

        debug!("Found {} different combinations in {} rows", counts.len(), rows);
        JointShares::from_counts(counts)
    }
}
