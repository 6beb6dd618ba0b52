//! Zone clustering
//!
//! Reduces the zone set to `k` representatives with k-means over the
//! centroids (longitude, latitude as planar coordinates). Each incident's
//! probability in a new zone is the plain mean over the absorbed zones.
//! Reachability is rebuilt from scratch for the new zones.

use crate::entities::Zone;
use crate::ids::{IncidentId, ZoneId};
use crate::registry::Scenario;
use crate::{Result, ScenarioError};
use coastal_geo::GeoPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const KMEANS_SEED: u64 = 0;
const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-10;

type Point = [f64; 2];

fn sq_dist(a: &Point, b: &Point) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn nearest(point: &Point, centers: &[Point]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, sq_dist(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding
fn initial_centers(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..points.len())]);

    while centers.len() < k {
        let d2: Vec<f64> = points.iter().map(|p| nearest(p, &centers).1).collect();
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, d) in d2.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };
        centers.push(points[next]);
    }
    centers
}

/// Lloyd iterations; returns final centers and per-point labels
fn kmeans(points: &[Point], k: usize, rng: &mut StdRng) -> (Vec<Point>, Vec<usize>) {
    let mut centers = initial_centers(points, k, rng);
    let mut labels = vec![0; points.len()];

    for iteration in 0..MAX_ITERATIONS {
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(p, &centers).0;
        }

        let mut sums = vec![[0.0, 0.0]; k];
        let mut counts = vec![0usize; k];
        for (label, p) in labels.iter().zip(points) {
            sums[*label][0] += p[0];
            sums[*label][1] += p[1];
            counts[*label] += 1;
        }

        let mut shift = 0.0;
        for c in 0..k {
            let updated = if counts[c] > 0 {
                [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64]
            } else {
                // relocate an empty cluster onto the worst-served point
                let (far, _) = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i, sq_dist(p, &centers[labels[i]])))
                    .fold((0, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
                labels[far] = c;
                points[far]
            };
            shift += sq_dist(&centers[c], &updated);
            centers[c] = updated;
        }

        if shift <= TOLERANCE {
            debug!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    for (label, p) in labels.iter_mut().zip(points) {
        *label = nearest(p, &centers).0;
    }
    (centers, labels)
}

/// Replace the scenario's zones with at most `k` cluster representatives
///
/// Returns the number of zones after clustering. With `k` at least the
/// current zone count every zone is its own cluster.
pub fn cluster_zones(scenario: &mut Scenario, k: usize) -> Result<usize> {
    if k == 0 {
        return Err(ScenarioError::Clustering("cluster count must be positive".to_string()));
    }
    let old: Vec<(ZoneId, GeoPoint)> = scenario.zones().map(|z| (z.id, z.position)).collect();
    if old.is_empty() {
        return Err(ScenarioError::Clustering("no zones to cluster".to_string()));
    }

    let (centers, labels): (Vec<Point>, Vec<usize>) = if k >= old.len() {
        (
            old.iter().map(|(_, p)| [p.longitude, p.latitude]).collect(),
            (0..old.len()).collect(),
        )
    } else {
        let points: Vec<Point> = old.iter().map(|(_, p)| [p.longitude, p.latitude]).collect();
        let mut rng = StdRng::seed_from_u64(KMEANS_SEED);
        kmeans(&points, k, &mut rng)
    };

    let mut members: Vec<Vec<ZoneId>> = vec![Vec::new(); centers.len()];
    for ((zone, _), label) in old.iter().zip(&labels) {
        members[*label].push(*zone);
    }

    let mut zones = Vec::with_capacity(centers.len());
    let mut probabilities: BTreeMap<IncidentId, BTreeMap<ZoneId, f64>> = BTreeMap::new();
    for (center, absorbed) in centers.iter().zip(&members) {
        if absorbed.is_empty() {
            warn!("Dropping empty cluster at ({:.4}, {:.4})", center[1], center[0]);
            continue;
        }
        let id = scenario.new_zone_id();
        zones.push(Zone::new(id, GeoPoint::new(center[1], center[0])));

        for incident in scenario.incidents() {
            let mean =
                absorbed.iter().map(|z| incident.probability(*z)).sum::<f64>() / absorbed.len() as f64;
            probabilities.entry(incident.id).or_default().insert(id, mean);
        }
    }

    let count = zones.len();
    info!("Clustered {} zones into {}", old.len(), count);
    scenario.replace_zones(zones, probabilities)?;
    Ok(count)
}
