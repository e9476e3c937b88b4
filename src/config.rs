use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::predict::{NameFilter, Observer, PassQuery};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Please specify both latitude and longitude")]
    MissingLocation,
    #[error("Please specify a TLE file")]
    MissingCatalog,
    #[error("cannot execute in non-realtime mode")]
    NotRealtime,
    #[error("no command given to execute")]
    MissingCommand,
    #[error("invalid time {input:?}: {message}")]
    InvalidTime { input: String, message: String },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("invalid search horizon: {0}")]
    Horizon(String),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pass-o-mat")]
#[command(about = "Predict satellite passes and run a command for their duration")]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// QTH latitude in degrees
    #[arg(long, env = "LATITUDE", value_name = "LATITUDE")]
    pub lat: Option<f64>,
    /// QTH longitude in degrees
    #[arg(long, env = "LONGITUDE", value_name = "LONGITUDE")]
    pub lon: Option<f64>,
    /// File containing TLEs
    #[arg(long, value_name = "FILE")]
    pub tle: Option<PathBuf>,
    /// Regexp for satellites to include, matched from the start of the name
    #[arg(long, default_value = ".*")]
    pub pattern: String,
    /// Number of passes per satellite
    #[arg(short, long, default_value_t = 1)]
    pub count: usize,
    /// Minimal maximum elevation of a pass, in degrees
    #[arg(short, long, default_value_t = 10.0)]
    pub elevation: f64,
    /// Time of observation: "now", an RFC 3339 time, or "now+6h"
    #[arg(short, long, default_value = "now")]
    pub time: String,
    /// Execute command for the duration of one or more passes
    #[arg(short = 'x', long)]
    pub execute: bool,
    /// YAML file with station location and defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory for command output and the execution log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// How far ahead to look for a single pass
    #[arg(long, default_value = "2d", value_parser = humantime::parse_duration)]
    pub horizon: std::time::Duration,
    /// Group the listing by overlapping passes
    #[arg(long)]
    pub chunks: bool,
    /// Print passes as JSON
    #[arg(long, conflicts_with = "chunks")]
    pub json: bool,
    /// Command and arguments to run for each group of passes
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub station: Option<StationConfig>,
    pub catalog: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Time the pass search starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeBase {
    /// System real time; the only base execute mode accepts.
    Now,
    At(DateTime<Utc>),
}

impl TimeBase {
    pub fn parse(input: &str, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let s = input.trim();
        let invalid = |message: String| ConfigError::InvalidTime {
            input: input.to_string(),
            message,
        };

        if s.eq_ignore_ascii_case("now") {
            return Ok(TimeBase::Now);
        }

        // Relative: now+6h, now - 30m
        if let Some(rest) = s.get(..3).filter(|p| p.eq_ignore_ascii_case("now")).map(|_| &s[3..]) {
            let rest = rest.trim_start();
            let (neg, rest) = match rest.strip_prefix('-') {
                Some(r) => (true, r),
                None => (
                    false,
                    rest.strip_prefix('+')
                        .ok_or_else(|| invalid("expected '+' or '-' after 'now'".into()))?,
                ),
            };
            let dur = parse_duration(rest).map_err(invalid)?;
            return Ok(TimeBase::At(if neg { now - dur } else { now + dur }));
        }

        DateTime::parse_from_rfc3339(s)
            .map(|dt| TimeBase::At(dt.with_timezone(&Utc)))
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeBase::Now => now,
            TimeBase::At(dt) => *dt,
        }
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Display { chunks: bool, json: bool },
    Execute {
        command: Vec<String>,
        log_dir: Option<PathBuf>,
    },
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub station: Station,
    pub epoch: DateTime<Utc>,
    pub catalog: PathBuf,
    pub filter: NameFilter,
    pub query: PassQuery,
    pub horizon: Duration,
    pub mode: Mode,
}

impl Settings {
    /// Merge the command line with the optional config file; command line
    /// and environment win.
    pub fn resolve(cli: Cli, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => ConfigFile::from_file(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(cli, file, now)
    }

    pub fn merge(cli: Cli, file: ConfigFile, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let station = file.station.as_ref();
        let latitude = cli.lat.or(station.map(|s| s.latitude));
        let longitude = cli.lon.or(station.map(|s| s.longitude));
        let (Some(latitude_deg), Some(longitude_deg)) = (latitude, longitude) else {
            return Err(ConfigError::MissingLocation);
        };
        if let Some(name) = station.and_then(|s| s.name.as_deref()) {
            log::debug!("Station {}", name);
        }

        let catalog = cli.tle.or(file.catalog).ok_or(ConfigError::MissingCatalog)?;
        let time_base = TimeBase::parse(&cli.time, now)?;

        let mode = if cli.execute {
            if time_base != TimeBase::Now {
                return Err(ConfigError::NotRealtime);
            }
            if cli.command.is_empty() {
                return Err(ConfigError::MissingCommand);
            }
            Mode::Execute {
                command: cli.command,
                log_dir: cli.log_dir.or(file.log_dir),
            }
        } else {
            Mode::Display {
                chunks: cli.chunks,
                json: cli.json,
            }
        };

        Ok(Self {
            station: Station {
                latitude_deg,
                longitude_deg,
                altitude_m: station.map_or(0.0, |s| s.altitude_m),
            },
            epoch: time_base.resolve(now),
            catalog,
            filter: NameFilter::new(&cli.pattern)?,
            query: PassQuery::new(cli.elevation, cli.count),
            horizon: Duration::from_std(cli.horizon)
                .map_err(|e| ConfigError::Horizon(e.to_string()))?,
            mode,
        })
    }

    pub fn observer(&self) -> Observer {
        Observer::from_degrees(self.station.latitude_deg, self.station.longitude_deg, self.epoch)
            .with_altitude(self.station.altitude_m)
    }
}
