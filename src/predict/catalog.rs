use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;

use crate::predict::engine::PropagationEngine;
use crate::predict::error::{PredictError, PropagationError};
use crate::predict::observer::Observer;
use crate::predict::types::Satellite;

/// One name / line 1 / line 2 record as read from the file.
#[derive(Debug, Clone, PartialEq)]
pub struct TleRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// Satellites from one TLE file that rise for the observer.
#[derive(Debug)]
pub struct Catalog {
    satellites: Vec<Satellite>,
}

impl Catalog {
    pub fn load<E: PropagationEngine + ?Sized>(
        path: &Path,
        engine: &E,
        observer: &Observer,
    ) -> Result<Self, PredictError> {
        let file = File::open(path)?;
        Self::from_reader(
            BufReader::new(file),
            &path.display().to_string(),
            engine,
            observer,
        )
    }

    pub fn from_reader<R: BufRead, E: PropagationEngine + ?Sized>(
        reader: R,
        source: &str,
        engine: &E,
        observer: &Observer,
    ) -> Result<Self, PredictError> {
        let mut satellites = Vec::new();

        for record in parse_records(reader, source)? {
            let satellite =
                Satellite::from_tle(&record.name, &record.line1, &record.line2, source)?;

            match engine.next_window(&satellite, observer) {
                Ok(_) => satellites.push(satellite),
                Err(PropagationError::NeverVisible) => {
                    // Probably geostationary
                    log::debug!("Skipping {}: never passes over observer", satellite.name);
                }
                Err(err) => {
                    return Err(PredictError::Propagation {
                        satellite: satellite.name,
                        source: err,
                    })
                }
            }
        }

        log::info!("Loaded {} satellites from {}", satellites.len(), source);
        Ok(Self { satellites })
    }

    pub fn satellites(&self) -> &[Satellite] {
        &self.satellites
    }

    pub fn matching<'a>(
        &'a self,
        filter: &'a NameFilter,
    ) -> impl Iterator<Item = &'a Satellite> + 'a {
        self.satellites
            .iter()
            .filter(move |sat| filter.matches(&sat.name))
    }
}

/// Split TLE text into 3-line records.
///
/// A record missing its second or third line is an error. Blank lines after
/// the last record are ignored.
pub fn parse_records<R: BufRead>(reader: R, source: &str) -> Result<Vec<TleRecord>, PredictError> {
    let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);

    let mut records = Vec::new();
    let mut i = 0;

    while i < end {
        if i + 2 >= end {
            return Err(PredictError::TruncatedRecord {
                file: source.to_string(),
                line: i + 1,
            });
        }
        records.push(TleRecord {
            name: lines[i].trim().to_string(),
            line1: lines[i + 1].trim_end().to_string(),
            line2: lines[i + 2].trim_end().to_string(),
        });
        i += 3;
    }

    Ok(records)
}

/// Satellite name pattern, anchored at the start of the name.
#[derive(Debug, Clone)]
pub struct NameFilter {
    regex: Regex,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}
