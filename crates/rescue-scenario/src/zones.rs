//! Zone input
//!
//! Zone centroids come either from a pre-sampled coordinate table
//! (`<data>/geo/<folder>/<n>_<seed>.csv`, header `lat,lon`) or from a
//! regular raster laid over the stations' bounding box.

use crate::{Result, ScenarioError, Water};
use coastal_geo::GeoPoint;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Location of a sampled zone table for one water body
pub fn zone_file_path(data_dir: &Path, water: Water, zones: usize, seed: u64) -> PathBuf {
    data_dir
        .join("geo")
        .join(water.zone_folder())
        .join(format!("{}_{}.csv", zones, seed))
}

/// Parse a `lat,lon` table; column order follows the header
pub fn read_zone_file(reader: impl BufRead) -> Result<Vec<GeoPoint>> {
    let mut lines = reader.lines().enumerate();

    let (lat_col, lon_col) = match lines.next() {
        Some((_, header)) => {
            let header = header?;
            let columns: Vec<&str> = header.split(',').map(|c| c.trim()).collect();
            let find = |name: &str| {
                columns.iter().position(|c| *c == name).ok_or_else(|| ScenarioError::ZoneFile {
                    line: 1,
                    reason: format!("missing column '{}'", name),
                })
            };
            (find("lat")?, find("lon")?)
        }
        None => return Ok(Vec::new()),
    };

    let mut points = Vec::new();
    for (idx, line) in lines {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        let field = |col: usize, name: &str| -> Result<f64> {
            let raw = fields.get(col).ok_or_else(|| ScenarioError::ZoneFile {
                line: line_no,
                reason: format!("missing {} value", name),
            })?;
            raw.parse::<f64>().map_err(|e| ScenarioError::ZoneFile {
                line: line_no,
                reason: format!("bad {} '{}': {}", name, raw, e),
            })
        };
        let point = GeoPoint::new(field(lat_col, "lat")?, field(lon_col, "lon")?);
        if !point.is_valid() {
            return Err(ScenarioError::ZoneFile {
                line: line_no,
                reason: format!("coordinates out of range: {}", point),
            });
        }
        points.push(point);
    }
    Ok(points)
}

pub fn load_zone_file(path: impl AsRef<Path>) -> Result<Vec<GeoPoint>> {
    let path = path.as_ref();
    debug!("Loading zones from {:?}", path);
    let file = File::open(path)?;
    read_zone_file(BufReader::new(file))
}

/// Axis-aligned box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// One raster cell: its lower-left corner and extent in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterCell {
    pub position: GeoPoint,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Smallest box containing every point; `None` for an empty set
    pub fn around<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = Bounds {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lon: first.longitude,
            max_lon: first.longitude,
        };
        Some(iter.fold(init, |b, p| Bounds {
            min_lat: b.min_lat.min(p.latitude),
            max_lat: b.max_lat.max(p.latitude),
            min_lon: b.min_lon.min(p.longitude),
            max_lon: b.max_lon.max(p.longitude),
        }))
    }

    /// Grow each side by `oversize` times the extent along that axis
    pub fn enlarge(self, oversize: f64) -> Self {
        let lat_pad = (self.max_lat - self.min_lat) * oversize;
        let lon_pad = (self.max_lon - self.min_lon) * oversize;
        Bounds {
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
            min_lon: self.min_lon - lon_pad,
            max_lon: self.max_lon + lon_pad,
        }
    }

    /// Square-ish cells covering the box, at most `max_zones` of them
    pub fn raster(&self, max_zones: usize) -> Vec<RasterCell> {
        let length = self.max_lon - self.min_lon;
        let width = self.max_lat - self.min_lat;
        let side = (length * width / max_zones.max(1) as f64).sqrt();

        let count = |extent: f64| -> usize {
            if side > 0.0 {
                ((extent / side).floor() as usize).max(1)
            } else {
                1
            }
        };
        let x_count = count(length);
        let y_count = count(width);
        let x_len = length / x_count as f64;
        let y_len = width / y_count as f64;

        let mut cells = Vec::with_capacity(x_count * y_count);
        for x in 0..x_count {
            for y in 0..y_count {
                cells.push(RasterCell {
                    position: GeoPoint::new(
                        self.min_lat + y as f64 * y_len,
                        self.min_lon + x as f64 * x_len,
                    ),
                    width: x_len,
                    height: y_len,
                });
            }
        }
        cells
    }
}
