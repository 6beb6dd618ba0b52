//! Reference gauges and their water-level series
//!
//! The catalogue is a JSON list of `{number, latitude, longitude, water}`.
//! Each gauge has a CSV series at `<root>/<water>/<number>.csv` with a header
//! row and rows `YYYY-MM-DD|HH:MM,<level cm>`; an empty level is a gap.

use crate::{Result, TidalError};
use chrono::NaiveDateTime;
use coastal_geo::GeoPoint;
use rescue_scenario::Water;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CATALOGUE_FILE: &str = "levels.json";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d|%H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub number: u32,
    pub position: GeoPoint,
    pub water: Water,
}

#[derive(Debug, Deserialize)]
struct RawGauge {
    number: u32,
    latitude: f64,
    longitude: f64,
    water: Water,
}

pub fn series_path(root: &Path, gauge: &Gauge) -> PathBuf {
    root.join(gauge.water.dir_name()).join(format!("{}.csv", gauge.number))
}

pub fn read_catalogue(reader: impl Read) -> Result<Vec<Gauge>> {
    let raw: Vec<RawGauge> = serde_json::from_reader(reader)?;
    let mut gauges = Vec::with_capacity(raw.len());
    for g in raw {
        let position = GeoPoint::checked(g.latitude, g.longitude).map_err(|e| TidalError::BadRow {
            gauge: g.number,
            line: 0,
            reason: e.to_string(),
        })?;
        gauges.push(Gauge {
            number: g.number,
            position,
            water: g.water,
        });
    }
    Ok(gauges)
}

/// Gauges of `water` that have a series on disk
pub fn load_catalogue(root: &Path, water: Water) -> Result<Vec<Gauge>> {
    let path = root.join(CATALOGUE_FILE);
    info!("Loading gauge catalogue from {:?}", path);
    let all = read_catalogue(BufReader::new(File::open(&path)?))?;
    let total = all.len();

    let gauges: Vec<Gauge> = all
        .into_iter()
        .filter(|g| water == Water::All || g.water == water)
        .filter(|g| series_path(root, g).exists())
        .collect();

    info!("Using {} of {} gauges for {}", gauges.len(), total, water);
    if gauges.is_empty() {
        return Err(TidalError::NoGauges(water));
    }
    Ok(gauges)
}

/// One row across all gauges
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeFrame {
    /// 1-based row number after the headers
    pub row: u64,
    pub timestamp: NaiveDateTime,
    /// Reading per gauge, in reader order; `None` for gaps
    pub levels: Vec<Option<f64>>,
}

/// Reads all series row by row in lockstep, stopping at the first exhausted series
pub struct LockstepReader<R> {
    numbers: Vec<u32>,
    series: Vec<Lines<R>>,
    row: u64,
    done: bool,
}

impl LockstepReader<BufReader<File>> {
    pub fn open(root: &Path, gauges: &[Gauge]) -> Result<Self> {
        let mut series = Vec::with_capacity(gauges.len());
        for gauge in gauges {
            let path = series_path(root, gauge);
            debug!("Opening series {:?}", path);
            series.push((gauge.number, BufReader::new(File::open(path)?)));
        }
        Self::new(series)
    }
}

impl<R: BufRead> LockstepReader<R> {
    /// Wrap readers and skip each header row
    pub fn new(series: Vec<(u32, R)>) -> Result<Self> {
        let mut numbers = Vec::with_capacity(series.len());
        let mut lines = Vec::with_capacity(series.len());
        let mut done = series.is_empty();
        for (number, reader) in series {
            let mut l = reader.lines();
            if l.next().transpose()?.is_none() {
                done = true;
            }
            numbers.push(number);
            lines.push(l);
        }
        Ok(Self {
            numbers,
            series: lines,
            row: 0,
            done,
        })
    }

    pub fn gauge_count(&self) -> usize {
        self.numbers.len()
    }

    pub fn next_frame(&mut self) -> Result<Option<GaugeFrame>> {
        if self.done {
            return Ok(None);
        }
        let row = self.row + 1;
        let mut timestamp: Option<(NaiveDateTime, String)> = None;
        let mut levels = Vec::with_capacity(self.series.len());

        for (number, lines) in self.numbers.iter().zip(self.series.iter_mut()) {
            let line = match next_data_line(lines)? {
                Some(line) => line,
                None => {
                    debug!("Reached end of series for gauge {}", number);
                    self.done = true;
                    return Ok(None);
                }
            };
            let (ts_raw, level_raw) = line.split_once(',').ok_or_else(|| TidalError::BadRow {
                gauge: *number,
                line: row + 1,
                reason: format!("expected '<timestamp>,<level>', got '{}'", line),
            })?;
            let ts_raw = ts_raw.trim();
            let ts = NaiveDateTime::parse_from_str(ts_raw, TIMESTAMP_FORMAT).map_err(|e| {
                TidalError::BadRow {
                    gauge: *number,
                    line: row + 1,
                    reason: format!("bad timestamp '{}': {}", ts_raw, e),
                }
            })?;
            match &timestamp {
                None => timestamp = Some((ts, ts_raw.to_string())),
                Some((expected, expected_raw)) if *expected != ts => {
                    return Err(TidalError::MisalignedSeries {
                        gauge: *number,
                        row,
                        expected: expected_raw.clone(),
                        found: ts_raw.to_string(),
                    });
                }
                Some(_) => {}
            }

            let level_raw = level_raw.trim();
            let level = if level_raw.is_empty() {
                None
            } else {
                Some(level_raw.parse::<f64>().map_err(|e| TidalError::BadRow {
                    gauge: *number,
                    line: row + 1,
                    reason: format!("bad level '{}': {}", level_raw, e),
                })?)
            };
            levels.push(level);
        }

        self.row = row;
        match timestamp {
            Some((timestamp, _)) => Ok(Some(GaugeFrame {
                row,
                timestamp,
                levels,
            })),
            None => Ok(None),
        }
    }
}

fn next_data_line<R: BufRead>(lines: &mut Lines<R>) -> Result<Option<String>> {
    for line in lines.by_ref() {
        let line = line?;
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
    Ok(None)
}
