use chrono::{DateTime, Utc};
use serde::Serialize;
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;

/// A catalog entry: name plus the parsed orbital elements.
pub struct Satellite {
    pub name: String,
    pub norad_id: u32,
    pub elements: Elements,
    pub constants: Constants,
}

impl Satellite {
    pub fn from_tle(
        name: &str,
        line1: &str,
        line2: &str,
        file: &str,
    ) -> Result<Self, PredictError> {
        let invalid = |message: String| PredictError::InvalidTle {
            file: file.to_string(),
            name: name.to_string(),
            message,
        };

        let elements = Elements::from_tle(
            Some(name.to_string()),
            line1.as_bytes(),
            line2.as_bytes(),
        )
        .map_err(|e| invalid(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            norad_id: elements.norad_id as u32,
            elements,
            constants,
        })
    }
}

impl std::fmt::Debug for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Satellite")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .finish()
    }
}

/// Next pass as reported by a propagation engine. Angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawWindow {
    pub rise: DateTime<Utc>,
    pub rise_azimuth: f64,
    pub culmination: DateTime<Utc>,
    pub peak_elevation: f64,
    pub set: DateTime<Utc>,
    pub set_azimuth: f64,
}

/// A single visibility window of one satellite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub satellite: String,
    pub norad_id: u32,
    pub aos: DateTime<Utc>,
    pub aos_azimuth_deg: f64,
    pub tca: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub los: DateTime<Utc>,
    pub los_azimuth_deg: f64,
}

impl Window {
    pub fn new(satellite: &Satellite, raw: RawWindow) -> Self {
        Self {
            satellite: satellite.name.clone(),
            norad_id: satellite.norad_id,
            aos: raw.rise,
            aos_azimuth_deg: raw.rise_azimuth.to_degrees(),
            tca: raw.culmination,
            max_elevation_deg: raw.peak_elevation.to_degrees(),
            los: raw.set,
            los_azimuth_deg: raw.set_azimuth.to_degrees(),
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.los - self.aos
    }
}
