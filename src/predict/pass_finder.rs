use chrono::Duration;

use crate::predict::engine::PropagationEngine;
use crate::predict::error::{PredictError, PropagationError};
use crate::predict::observer::Observer;
use crate::predict::types::{Satellite, Window};

/// Engine calls allowed per satellite before giving up on the search.
pub const DEFAULT_MAX_QUERIES: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct PassQuery {
    pub min_elevation_deg: f64,
    pub count: usize,
    pub max_queries: usize,
}

impl PassQuery {
    pub fn new(min_elevation_deg: f64, count: usize) -> Self {
        Self {
            min_elevation_deg,
            count,
            max_queries: DEFAULT_MAX_QUERIES,
        }
    }
}

/// Collect the next `query.count` passes of `satellite` whose peak elevation
/// is above `query.min_elevation_deg`, starting at `observer.epoch`.
///
/// Fewer passes are returned when the engine finds no further pass within its
/// horizon or when `query.max_queries` is exhausted.
pub fn predict_passes<E: PropagationEngine + ?Sized>(
    engine: &E,
    satellite: &Satellite,
    observer: &Observer,
    query: &PassQuery,
) -> Result<Vec<Window>, PredictError> {
    let mut passes = Vec::with_capacity(query.count);
    let mut cursor = *observer;
    let mut queries = 0;

    while passes.len() < query.count {
        if queries == query.max_queries {
            log::warn!(
                "{}: no further passes above {} deg after {} searches ({} of {} found)",
                satellite.name,
                query.min_elevation_deg,
                queries,
                passes.len(),
                query.count
            );
            break;
        }
        queries += 1;

        let raw = match engine.next_window(satellite, &cursor) {
            Ok(raw) => raw,
            Err(PropagationError::NeverVisible) => {
                log::warn!(
                    "{}: no further passes after {} ({} of {} found)",
                    satellite.name,
                    cursor.epoch,
                    passes.len(),
                    query.count
                );
                break;
            }
            Err(source) => {
                return Err(PredictError::Propagation {
                    satellite: satellite.name.clone(),
                    source,
                })
            }
        };
        let pass = Window::new(satellite, raw);

        // Skip over the pass so the next search picks up the one after it
        cursor = cursor.at(pass.los + Duration::seconds(1));

        if pass.max_elevation_deg > query.min_elevation_deg {
            passes.push(pass);
        } else {
            log::debug!(
                "{}: skipping pass at {} ({:.2} deg, {}s)",
                pass.satellite,
                pass.aos,
                pass.max_elevation_deg,
                pass.duration().num_seconds()
            );
        }
    }

    Ok(passes)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::predict::types::fixtures::{at, iss};
    use crate::predict::engine::Sgp4Engine;
    use crate::predict::types::RawWindow;

    /// Engine returning scripted passes, one per call, each 10 minutes long and
    /// starting 90 minutes after the cursor.
    struct ScriptedEngine {
        elevations_deg: Vec<f64>,
        calls: Cell<usize>,
        cursors: RefCell<Vec<DateTime<Utc>>>,
    }

    impl ScriptedEngine {
        fn new(elevations_deg: &[f64]) -> Self {
            Self {
                elevations_deg: elevations_deg.to_vec(),
                calls: Cell::new(0),
                cursors: RefCell::new(Vec::new()),
            }
        }
    }

    impl PropagationEngine for ScriptedEngine {
        fn next_window(
            &self,
            _satellite: &Satellite,
            observer: &Observer,
        ) -> Result<RawWindow, PropagationError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            self.cursors.borrow_mut().push(observer.epoch);

            let elevation = *self
                .elevations_deg
                .get(call)
                .ok_or(PropagationError::NeverVisible)?;
            let rise = observer.epoch + Duration::minutes(90);
            Ok(RawWindow {
                rise,
                rise_azimuth: 0.0,
                culmination: rise + Duration::minutes(5),
                peak_elevation: elevation.to_radians(),
                set: rise + Duration::minutes(10),
                set_azimuth: 0.0,
            })
        }
    }

    /// Engine that never runs dry.
    struct EndlessEngine {
        elevation_deg: f64,
    }

    impl PropagationEngine for EndlessEngine {
        fn next_window(
            &self,
            _satellite: &Satellite,
            observer: &Observer,
        ) -> Result<RawWindow, PropagationError> {
            let rise = observer.epoch + Duration::minutes(30);
            Ok(RawWindow {
                rise,
                rise_azimuth: 0.0,
                culmination: rise + Duration::minutes(4),
                peak_elevation: self.elevation_deg.to_radians(),
                set: rise + Duration::minutes(8),
                set_azimuth: 0.0,
            })
        }
    }

    struct BrokenEngine;

    impl PropagationEngine for BrokenEngine {
        fn next_window(
            &self,
            _satellite: &Satellite,
            _observer: &Observer,
        ) -> Result<RawWindow, PropagationError> {
            Err(PropagationError::Failed("diverged".into()))
        }
    }

    fn observer() -> Observer {
        Observer::from_degrees(52.0, 5.0, at(0))
    }

    #[test]
    fn skips_passes_below_minimum_elevation() {
        let engine = ScriptedEngine::new(&[5.0, 20.0, 30.0]);
        let passes =
            predict_passes(&engine, &iss(), &observer(), &PassQuery::new(10.0, 2)).unwrap();

        let peaks: Vec<_> = passes.iter().map(|p| p.max_elevation_deg.round()).collect();
        assert_eq!(peaks, vec![20.0, 30.0]);
        assert_eq!(engine.calls.get(), 3);
    }

    #[test]
    fn cursor_advances_one_second_past_each_set() {
        let engine = ScriptedEngine::new(&[5.0, 20.0, 30.0]);
        predict_passes(&engine, &iss(), &observer(), &PassQuery::new(10.0, 2)).unwrap();

        let cursors = engine.cursors.borrow();
        assert_eq!(cursors[0], at(0));
        // first pass: 01:30 -- 01:40 after the epoch
        assert_eq!(cursors[1], at(100) + Duration::seconds(1));
    }

    #[test]
    fn peak_equal_to_minimum_is_rejected() {
        let engine = ScriptedEngine::new(&[0.0, 10.5]);
        let passes =
            predict_passes(&engine, &iss(), &observer(), &PassQuery::new(0.0, 1)).unwrap();
        assert_eq!(passes.len(), 1);
        assert_eq!(engine.calls.get(), 2);
    }

    #[test]
    fn returns_requested_count_in_time_order() {
        let engine = EndlessEngine { elevation_deg: 40.0 };
        let passes =
            predict_passes(&engine, &iss(), &observer(), &PassQuery::new(10.0, 5)).unwrap();

        assert_eq!(passes.len(), 5);
        assert!(passes.windows(2).all(|w| w[0].los < w[1].aos));
        assert!(passes.iter().all(|p| p.max_elevation_deg > 10.0));
    }

    #[test]
    fn stops_when_engine_runs_out_of_passes() {
        let engine = ScriptedEngine::new(&[30.0]);
        let passes =
            predict_passes(&engine, &iss(), &observer(), &PassQuery::new(10.0, 3)).unwrap();
        assert_eq!(passes.len(), 1);
    }

    #[test]
    fn stops_after_query_cap() {
        let engine = EndlessEngine { elevation_deg: 2.0 };
        let query = PassQuery {
            max_queries: 25,
            ..PassQuery::new(10.0, 1)
        };
        let passes = predict_passes(&engine, &iss(), &observer(), &query).unwrap();
        assert!(passes.is_empty());
    }

    #[test]
    fn propagation_failure_is_fatal() {
        let err = predict_passes(&BrokenEngine, &iss(), &observer(), &PassQuery::new(10.0, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictError::Propagation { ref satellite, .. } if satellite == "ISS (ZARYA)"
        ));
    }

    #[test]
    fn sgp4_passes_at_zero_elevation_do_not_repeat() {
        let passes = predict_passes(
            &Sgp4Engine::default(),
            &iss(),
            &observer(),
            &PassQuery::new(0.0, 4),
        )
        .unwrap();

        assert_eq!(passes.len(), 4);
        for pair in passes.windows(2) {
            let gap = pair[1].aos - pair[0].los;
            assert!(gap > Duration::minutes(10), "{} -- {}", pair[0].los, pair[1].aos);
        }
    }
}
