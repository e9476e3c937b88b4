use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::predict::Window;

/// Passes whose time spans overlap, directly or through other passes in the
/// group. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    windows: Vec<Window>,
}

impl Chunk {
    fn seed(window: Window) -> Self {
        Self {
            start: window.aos,
            end: window.los,
            windows: vec![window],
        }
    }

    fn push(&mut self, window: Window) {
        self.start = self.start.min(window.aos);
        self.end = self.end.max(window.los);
        self.windows.push(window);
    }

    /// Earliest AOS in the chunk.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Latest LOS in the chunk.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Satellite names in pass order, duplicates removed.
    pub fn satellites(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for window in &self.windows {
            if !names.contains(&window.satellite) {
                names.push(window.satellite.clone());
            }
        }
        names
    }
}

/// Sort passes by AOS, keeping generation order for equal AOS times.
pub fn sort_windows(windows: &mut [Window]) {
    windows.sort_by_key(|w| w.aos);
}

/// Take a list of passes sorted by AOS and group overlapping passes together.
///
/// A pass joins the current chunk when it rises no later than the latest LOS
/// seen in that chunk so far.
pub fn merge(windows: Vec<Window>) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();

    for window in windows {
        match chunks.last_mut() {
            Some(chunk) if window.aos <= chunk.end => chunk.push(window),
            _ => chunks.push(Chunk::seed(window)),
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::predict::fixtures::{at, window};

    fn flatten(chunks: &[Chunk]) -> Vec<Window> {
        chunks.iter().flat_map(|c| c.windows().to_vec()).collect()
    }

    #[test]
    fn overlapping_passes_share_a_chunk() {
        let a = window("A", 0, 10);
        let b = window("B", 5, 20);
        let c = window("C", 25, 30);

        let chunks = merge(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].windows(), &[a, b]);
        assert_eq!(chunks[0].start(), at(0));
        assert_eq!(chunks[0].end(), at(20));
        assert_eq!(chunks[1].windows(), &[c]);
        assert_eq!(chunks[1].start(), at(25));
        assert_eq!(chunks[1].end(), at(30));
    }

    #[test]
    fn touching_passes_merge() {
        let chunks = merge(vec![window("A", 0, 10), window("B", 10, 15)]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end(), at(15));
    }

    #[test]
    fn uses_running_maximum_los_not_last_pass() {
        // B ends before A, C still overlaps A
        let chunks = merge(vec![
            window("A", 0, 30),
            window("B", 5, 10),
            window("C", 20, 40),
            window("D", 41, 45),
        ]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].windows().len(), 3);
        assert_eq!(chunks[0].end(), at(40));
        assert_eq!(chunks[1].windows()[0].satellite, "D");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(merge(Vec::new()).is_empty());
    }

    #[test]
    fn sort_is_stable_for_equal_aos() {
        let mut windows = vec![
            window("LATE", 30, 40),
            window("FIRST", 0, 10),
            window("SECOND", 0, 5),
        ];
        sort_windows(&mut windows);
        let names: Vec<_> = windows.iter().map(|w| w.satellite.as_str()).collect();
        assert_eq!(names, vec!["FIRST", "SECOND", "LATE"]);
    }

    #[test]
    fn satellites_are_listed_once() {
        let chunks = merge(vec![
            window("ISS", 0, 10),
            window("NOAA 19", 2, 12),
            window("ISS", 11, 20),
        ]);
        assert_eq!(chunks[0].satellites(), vec!["ISS", "NOAA 19"]);
    }

    #[test]
    fn random_timelines_are_connected_maximal_and_idempotent() {
        let mut rng = SmallRng::seed_from_u64(0x5a7);

        for _ in 0..200 {
            let n = rng.random_range(0..40);
            let mut windows: Vec<Window> = (0..n)
                .map(|i| {
                    let aos = rng.random_range(0..600);
                    let len = rng.random_range(1..30);
                    window(&format!("SAT-{i}"), aos, aos + len)
                })
                .collect();
            sort_windows(&mut windows);

            let chunks = merge(windows.clone());
            assert_eq!(flatten(&chunks), windows);

            for chunk in &chunks {
                let mut max_los = chunk.windows()[0].los;
                for w in &chunk.windows()[1..] {
                    assert!(w.aos <= max_los);
                    max_los = max_los.max(w.los);
                }
                assert_eq!(chunk.end(), max_los);
                assert_eq!(chunk.start(), chunk.windows()[0].aos);
            }

            for pair in chunks.windows(2) {
                assert!(pair[1].windows()[0].aos > pair[0].end());
            }

            assert_eq!(merge(flatten(&chunks)), chunks);
        }
    }
}
