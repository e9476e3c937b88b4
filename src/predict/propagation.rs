use chrono::{DateTime, Utc};

use crate::predict::error::PropagationError;
use crate::predict::observer::Observer;
use crate::predict::types::Satellite;

/// Topocentric direction of a satellite at one instant. Angles in radians.
#[derive(Debug, Clone, Copy)]
pub struct LookAngles {
    pub timestamp: DateTime<Utc>,
    pub azimuth: f64,
    pub elevation: f64,
    pub range_km: f64,
}

impl LookAngles {
    pub fn is_visible(&self) -> bool {
        self.elevation >= 0.0
    }
}

pub fn look_angles(
    observer: &Observer,
    satellite: &Satellite,
    timestamp: DateTime<Utc>,
) -> Result<LookAngles, PropagationError> {
    let minutes = satellite
        .elements
        .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
        .map_err(|e| PropagationError::Failed(e.to_string()))?;

    let prediction = satellite.constants.propagate(minutes)?;

    let sidereal =
        sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()));

    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
    let sta_ecef = observer.position_ecef_km();

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.latitude_rad, observer.longitude_rad);
    let azimuth = east.atan2(north).rem_euclid(std::f64::consts::TAU);
    let elevation = if range_km > 0.0 {
        (up / range_km).asin()
    } else {
        0.0
    };

    Ok(LookAngles {
        timestamp,
        azimuth,
        elevation,
        range_km,
    })
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zenith_is_straight_up() {
        let (east, north, up) = ecef_to_enu([0.0, 0.0, 100.0], std::f64::consts::FRAC_PI_2, 0.0);
        assert!(east.abs() < 1e-9);
        assert!(north.abs() < 1e-9);
        assert!((up - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_sidereal_angle_is_identity() {
        assert_eq!(teme_to_ecef_position([1.0, 2.0, 3.0], 0.0), [1.0, 2.0, 3.0]);
    }
}
