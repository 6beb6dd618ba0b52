//! Joint share distribution
//!
//! A [`Combination`] lists, per station that is open at all, the sorted
//! vessel types whose draught fits. [`JointShares`] maps every observed
//! combination to the fraction of rows it held; the fractions sum to one.

use crate::{Result, TidalError, SHARE_SUM_TOLERANCE};
use rescue_scenario::{ShareRecord, StationId, VesselId};
use std::collections::{BTreeMap, BTreeSet};

/// Stations open at one instant and the vessel types fitting each
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Combination(Vec<(StationId, Vec<VesselId>)>);

impl Combination {
    /// Normalize: stations ascending, vessels ascending, empty entries dropped
    pub fn new(entries: impl IntoIterator<Item = (StationId, Vec<VesselId>)>) -> Self {
        let mut merged: BTreeMap<StationId, BTreeSet<VesselId>> = BTreeMap::new();
        for (station, vessels) in entries {
            merged.entry(station).or_default().extend(vessels);
        }
        Combination(
            merged
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(s, v)| (s, v.into_iter().collect()))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[(StationId, Vec<VesselId>)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn stations(&self) -> impl Iterator<Item = StationId> + '_ {
        self.0.iter().map(|(s, _)| *s)
    }

    /// Vessel types fitting at `station`, empty when the station is closed
    pub fn open_vessels(&self, station: StationId) -> &[VesselId] {
        match self.0.binary_search_by_key(&station, |(s, _)| *s) {
            Ok(idx) => &self.0[idx].1,
            Err(_) => &[],
        }
    }

    pub fn is_open(&self, station: StationId, vessel: VesselId) -> bool {
        self.open_vessels(station).binary_search(&vessel).is_ok()
    }

    pub fn open_pairs(&self) -> impl Iterator<Item = (StationId, VesselId)> + '_ {
        self.0
            .iter()
            .flat_map(|(s, vs)| vs.iter().map(move |v| (*s, *v)))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointShares {
    shares: BTreeMap<Combination, f64>,
}

impl JointShares {
    /// Fractions from occurrence counts
    pub fn from_counts(counts: BTreeMap<Combination, u64>) -> Result<Self> {
        let total: u64 = counts.values().sum();
        if total == 0 {
            return Err(TidalError::InvalidShares("no rows observed".to_string()));
        }
        let shares = counts
            .into_iter()
            .map(|(c, n)| (c, n as f64 / total as f64))
            .collect();
        Ok(Self { shares })
    }

    /// Validated fractions; duplicates are summed
    pub fn from_fractions(items: impl IntoIterator<Item = (Combination, f64)>) -> Result<Self> {
        let mut shares: BTreeMap<Combination, f64> = BTreeMap::new();
        for (combination, fraction) in items {
            if !(fraction.is_finite() && (0.0..=1.0).contains(&fraction)) {
                return Err(TidalError::InvalidShares(format!(
                    "fraction {} outside [0, 1]",
                    fraction
                )));
            }
            *shares.entry(combination).or_insert(0.0) += fraction;
        }
        let joint = Self { shares };
        let total = joint.total();
        if (total - 1.0).abs() > SHARE_SUM_TOLERANCE {
            return Err(TidalError::InvalidShares(format!(
                "fractions sum to {}, expected 1",
                total
            )));
        }
        Ok(joint)
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Combination, f64)> {
        self.shares.iter().map(|(c, f)| (c, *f))
    }

    pub fn fraction(&self, combination: &Combination) -> f64 {
        self.shares.get(combination).copied().unwrap_or(0.0)
    }

    /// Every station mentioned by any combination
    pub fn stations(&self) -> BTreeSet<StationId> {
        self.shares.keys().flat_map(|c| c.stations()).collect()
    }

    /// Every vessel type mentioned by any combination
    pub fn vessels(&self) -> BTreeSet<VesselId> {
        self.shares
            .keys()
            .flat_map(|c| c.open_pairs().map(|(_, v)| v))
            .collect()
    }

    pub fn to_records(&self) -> Vec<ShareRecord> {
        self.shares
            .iter()
            .map(|(c, f)| ShareRecord {
                key: c.entries().to_vec(),
                value: *f,
            })
            .collect()
    }

    /// Decode share records, checking every referenced id against the known sets
    pub fn from_records(
        records: Vec<ShareRecord>,
        stations: &BTreeSet<StationId>,
        vessels: &BTreeSet<VesselId>,
    ) -> Result<Self> {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            for (station, fitting) in &record.key {
                if !stations.contains(station) {
                    return Err(TidalError::DanglingStation(*station));
                }
                if let Some(v) = fitting.iter().find(|v| !vessels.contains(v)) {
                    return Err(TidalError::DanglingVessel(*v));
                }
            }
            items.push((Combination::new(record.key), record.value));
        }
        Self::from_fractions(items)
    }
}
