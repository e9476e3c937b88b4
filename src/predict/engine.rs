use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PropagationError;
use crate::predict::observer::Observer;
use crate::predict::propagation::{look_angles, LookAngles};
use crate::predict::types::{RawWindow, Satellite};

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for initial scan
const FINE_STEP_SECONDS: i64 = 1; // 1 second for refinement
const DEFAULT_HORIZON: Duration = Duration::days(2);

/// Finds the next visibility window of a satellite.
pub trait PropagationEngine {
    /// Next pass at or after `observer.epoch`.
    ///
    /// Returns [`PropagationError::NeverVisible`] when the satellite does not
    /// rise, or does not set again, within the engine's search horizon.
    fn next_window(
        &self,
        satellite: &Satellite,
        observer: &Observer,
    ) -> Result<RawWindow, PropagationError>;
}

/// SGP4 based engine: coarse scan for horizon crossings, then bisection.
#[derive(Debug, Clone, Copy)]
pub struct Sgp4Engine {
    step: Duration,
    horizon: Duration,
}

impl Default for Sgp4Engine {
    fn default() -> Self {
        Self {
            step: Duration::seconds(COARSE_STEP_SECONDS),
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl Sgp4Engine {
    pub fn with_horizon(horizon: Duration) -> Self {
        Self {
            horizon,
            ..Self::default()
        }
    }
}

impl PropagationEngine for Sgp4Engine {
    fn next_window(
        &self,
        satellite: &Satellite,
        observer: &Observer,
    ) -> Result<RawWindow, PropagationError> {
        let start = observer.epoch;
        let end = start + self.horizon;

        let first = look_angles(observer, satellite, start)?;
        let mut rise: Option<(DateTime<Utc>, f64)> = first
            .is_visible()
            .then_some((start, first.azimuth));
        let mut peak = first;
        let mut cursor = start;

        while cursor < end {
            let previous = cursor;
            cursor += self.step;
            let sample = look_angles(observer, satellite, cursor)?;

            match rise {
                None if sample.is_visible() => {
                    rise = Some(refine_crossing(observer, satellite, previous, cursor, true)?);
                    peak = sample;
                }
                None => {}
                Some(_) if sample.is_visible() => {
                    if sample.elevation > peak.elevation {
                        peak = sample;
                    }
                }
                Some((rise_time, rise_azimuth)) => {
                    let (set_time, set_azimuth) =
                        refine_crossing(observer, satellite, previous, cursor, false)?;
                    let lower = (peak.timestamp - self.step).max(rise_time);
                    let upper = (peak.timestamp + self.step).min(set_time);
                    let culmination = refine_culmination(observer, satellite, lower, upper)?;

                    log::debug!(
                        "{}: pass {} -- {}, peak {:.1} deg at {:.0} km",
                        satellite.name,
                        rise_time,
                        set_time,
                        culmination.elevation.to_degrees(),
                        culmination.range_km
                    );

                    return Ok(RawWindow {
                        rise: rise_time,
                        rise_azimuth,
                        culmination: culmination.timestamp,
                        peak_elevation: culmination.elevation,
                        set: set_time,
                        set_azimuth,
                    });
                }
            }
        }

        Err(PropagationError::NeverVisible)
    }
}

/// Binary search to find exact horizon crossing time
fn refine_crossing(
    observer: &Observer,
    satellite: &Satellite,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    rising: bool,
) -> Result<(DateTime<Utc>, f64), PropagationError> {
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = look_angles(observer, satellite, mid)?.is_visible();
        if above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    // First sample past the crossing: visible when rising, below the horizon
    // when setting
    let sample = look_angles(observer, satellite, high)?;
    Ok((high, sample.azimuth))
}

/// Ternary search for the elevation maximum inside `[low, high]`.
fn refine_culmination(
    observer: &Observer,
    satellite: &Satellite,
    mut low: DateTime<Utc>,
    mut high: DateTime<Utc>,
) -> Result<LookAngles, PropagationError> {
    while (high - low).num_seconds() > 2 * FINE_STEP_SECONDS {
        let third = (high - low) / 3;
        let a = look_angles(observer, satellite, low + third)?;
        let b = look_angles(observer, satellite, high - third)?;
        if a.elevation < b.elevation {
            low = a.timestamp;
        } else {
            high = b.timestamp;
        }
    }

    look_angles(observer, satellite, low + (high - low) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::types::fixtures::{at, iss};

    #[test]
    fn finds_an_iss_pass_over_mid_latitudes() {
        let observer = Observer::from_degrees(45.0, 5.0, at(0));
        let window = Sgp4Engine::default().next_window(&iss(), &observer).unwrap();

        assert!(window.rise >= observer.epoch);
        assert!(window.rise < window.culmination);
        assert!(window.culmination < window.set);
        assert!(window.peak_elevation > 0.0);
        assert!(window.set - window.rise < Duration::minutes(20));
        assert!((0.0..std::f64::consts::TAU).contains(&window.rise_azimuth));
    }

    #[test]
    fn consecutive_queries_move_forward() {
        let engine = Sgp4Engine::default();
        let observer = Observer::from_degrees(45.0, 5.0, at(0));
        let first = engine.next_window(&iss(), &observer).unwrap();
        let second = engine
            .next_window(&iss(), &observer.at(first.set + Duration::seconds(1)))
            .unwrap();
        assert!(second.rise > first.set);
    }

    #[test]
    fn satellite_is_below_horizon_at_set() {
        let observer = Observer::from_degrees(45.0, 5.0, at(0));
        let window = Sgp4Engine::default().next_window(&iss(), &observer).unwrap();

        let at_set = look_angles(&observer, &iss(), window.set).unwrap();
        let before_set = look_angles(&observer, &iss(), window.set - Duration::seconds(1)).unwrap();
        assert!(!at_set.is_visible());
        assert!(before_set.is_visible());
    }

    #[test]
    fn polar_observer_never_sees_low_inclination_orbit() {
        let observer = Observer::from_degrees(-89.0, 0.0, at(0));
        let err = Sgp4Engine::with_horizon(Duration::hours(12))
            .next_window(&iss(), &observer)
            .unwrap_err();
        assert!(matches!(err, PropagationError::NeverVisible));
    }
}
