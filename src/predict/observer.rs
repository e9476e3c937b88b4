use chrono::{DateTime, Utc};

/// Ground location plus the instant a pass search starts from.
///
/// The observer is a plain value: a search advances its own copy through
/// [`Observer::at`] rather than mutating a shared instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude_rad: f64,
    pub longitude_rad: f64,
    pub altitude_m: f64,
    pub epoch: DateTime<Utc>,
}

impl Observer {
    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64, epoch: DateTime<Utc>) -> Self {
        Self {
            latitude_rad: latitude_deg.to_radians(),
            longitude_rad: longitude_deg.to_radians(),
            altitude_m: 0.0,
            epoch,
        }
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    /// Same location, different epoch.
    pub fn at(&self, epoch: DateTime<Utc>) -> Self {
        Self { epoch, ..*self }
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let sin_lat = self.latitude_rad.sin();
        let cos_lat = self.latitude_rad.cos();
        let sin_lon = self.longitude_rad.sin();
        let cos_lon = self.longitude_rad.cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        let x = (n + alt_km) * cos_lat * cos_lon;
        let y = (n + alt_km) * cos_lat * sin_lon;
        let z = (n * (1.0 - e2) + alt_km) * sin_lat;
        [x, y, z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::types::fixtures::at;

    #[test]
    fn at_keeps_location() {
        let observer = Observer::from_degrees(52.0, 5.0, at(0)).with_altitude(12.0);
        let later = observer.at(at(90));
        assert_eq!(later.epoch, at(90));
        assert_eq!(later.latitude_rad, observer.latitude_rad);
        assert_eq!(later.altitude_m, 12.0);
        assert_eq!(observer.epoch, at(0));
    }

    #[test]
    fn equator_prime_meridian_is_on_x_axis() {
        let pos = Observer::from_degrees(0.0, 0.0, at(0)).position_ecef_km();
        assert!((pos[0] - 6378.137).abs() < 1e-6);
        assert!(pos[1].abs() < 1e-9);
        assert!(pos[2].abs() < 1e-9);
    }
}
