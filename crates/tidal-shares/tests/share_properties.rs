//! Property tests for joint shares and their consolidation

use proptest::prelude::*;
use rescue_scenario::{GeoPoint, Scenario, Station, StationId, VesselId, VesselType};
use std::collections::BTreeMap;
use tidal_shares::{Combination, ConsolidatedShares, JointShares};

const STATIONS: u32 = 3;
const VESSELS: u32 = 2;

/// Three stations, two vessel types, every pair allowed
fn scenario(fleets: &[u32]) -> Scenario {
    let mut sc = Scenario::new();
    for (v, fleet) in fleets.iter().enumerate() {
        sc.insert_vessel(VesselType::new(VesselId(v as u32), *fleet, 15.0)).unwrap();
    }
    for s in 0..STATIONS {
        sc.insert_station(Station::new(StationId(s), GeoPoint::new(54.0, 7.5 + f64::from(s))))
            .unwrap();
        for v in 0..fleets.len() as u32 {
            sc.allow(StationId(s), VesselId(v)).unwrap();
        }
    }
    sc
}

/// Observed rows as (open-cell mask, row count)
fn observations() -> impl Strategy<Value = Vec<(Vec<bool>, u64)>> {
    prop::collection::vec(
        (prop::collection::vec(any::<bool>(), (STATIONS * VESSELS) as usize), 1u64..50),
        1..8,
    )
}

fn joint_from(rows: &[(Vec<bool>, u64)]) -> JointShares {
    let mut counts: BTreeMap<Combination, u64> = BTreeMap::new();
    for (mask, count) in rows {
        let entries = (0..STATIONS).map(|s| {
            let open = (0..VESSELS)
                .filter(|v| mask[(s * VESSELS + v) as usize])
                .map(VesselId)
                .collect::<Vec<_>>();
            (StationId(s), open)
        });
        *counts.entry(Combination::new(entries)).or_insert(0) += count;
    }
    JointShares::from_counts(counts).unwrap()
}

proptest! {
    #[test]
    fn test_counts_normalize_to_one(rows in observations()) {
        let joint = joint_from(&rows);
        prop_assert!((joint.total() - 1.0).abs() < 1e-9);
        prop_assert!(joint.len() <= rows.len());
    }

    #[test]
    fn test_usable_matches_open_mass(rows in observations()) {
        let joint = joint_from(&rows);
        let total: u64 = rows.iter().map(|(_, c)| c).sum();
        let sc = scenario(&[1, 1]);
        let consolidated = ConsolidatedShares::from_joint(&joint, &sc);

        for s in 0..STATIONS {
            for v in 0..VESSELS {
                let open: u64 = rows
                    .iter()
                    .filter(|(mask, _)| mask[(s * VESSELS + v) as usize])
                    .map(|(_, c)| c)
                    .sum();
                let expected = open as f64 / total as f64;
                let usable = consolidated.usable(StationId(s), VesselId(v));
                prop_assert!((usable - expected).abs() < 1e-9);
                prop_assert!((0.0..=1.0).contains(&consolidated.closed_fraction(StationId(s), VesselId(v))));
            }
        }
    }

    #[test]
    fn test_thresholds_stay_in_unit_interval(rows in observations(), fleets in prop::collection::vec(1u32..5, 2)) {
        let joint = joint_from(&rows);
        let mut sc = scenario(&fleets);
        let consolidated = ConsolidatedShares::from_joint(&joint, &sc);
        consolidated.apply_thresholds(&mut sc).unwrap();

        for station in sc.stations() {
            prop_assert!((0.0..=1.0).contains(&station.min_availability));
            prop_assert_eq!(station.min_availability, consolidated.threshold(station.id));
        }
        let closed = consolidated.closed_fractions();
        prop_assert!(closed.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_records_preserve_distribution(rows in observations()) {
        let joint = joint_from(&rows);
        let decoded = JointShares::from_records(
            joint.to_records(),
            &(0..STATIONS).map(StationId).collect(),
            &(0..VESSELS).map(VesselId).collect(),
        )
        .unwrap();
        prop_assert_eq!(decoded, joint);
    }
}
