//! Trip position history.
//!
//! Maintains the bounded trail of recent location samples for one trip and
//! the record types the backend reports alongside it.
//!
//! # Design
//!
//! - Stores at most `cap` samples (default 200), oldest first
//! - Eviction is purely positional (FIFO), never access-based
//! - Appends keep the trail non-decreasing by `captured_at`

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;

/// Default maximum samples retained per trip.
pub const DEFAULT_HISTORY_CAP: usize = 200;

/// A single reported vehicle position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    pub captured_at: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(coordinate: Coordinate, captured_at: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            captured_at,
        }
    }
}

/// Server-computed alert that the vehicle left its planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationWarning {
    pub timestamp: DateTime<Utc>,
    pub distance_from_route_meters: f64,
    pub details: String,
}

/// Result of merging a batch into a [`PathHistory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Samples appended to the trail.
    pub appended: usize,
    /// Samples skipped because the trail already held them.
    pub skipped: usize,
    /// Samples evicted from the front to respect the cap.
    pub evicted: usize,
}

/// Bounded, time-ordered trail of location samples.
///
/// # Usage
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use triptrack::coord::Coordinate;
/// use triptrack::history::{LocationSample, PathHistory};
///
/// let mut history = PathHistory::with_cap(2);
/// let at = |s| Utc.timestamp_opt(s, 0).unwrap();
/// let here = Coordinate::new(51.5, -0.12).unwrap();
///
/// history.merge(vec![
///     LocationSample::new(here, at(1)),
///     LocationSample::new(here, at(2)),
///     LocationSample::new(here, at(3)),
/// ]);
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.latest().unwrap().captured_at, at(3));
/// ```
#[derive(Debug, Clone)]
pub struct PathHistory {
    /// Samples, oldest first.
    samples: VecDeque<LocationSample>,
    cap: usize,
}

impl Default for PathHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PathHistory {
    /// Create an empty history with the default cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }

    /// Create an empty history holding at most `cap` samples (minimum 1).
    pub fn with_cap(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Merge a freshly fetched batch into the trail.
    ///
    /// The batch is ordered by `captured_at` (stable, so equal timestamps keep
    /// their arrival order). Samples older than the current tail, and exact
    /// repeats of samples already in the trail, come from an earlier
    /// overlapping fetch and are skipped. Distinct samples sharing a
    /// timestamp are kept. The cap is enforced after the append.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = LocationSample>) -> MergeOutcome {
        let mut batch: Vec<LocationSample> = batch.into_iter().collect();
        batch.sort_by_key(|s| s.captured_at);

        let tail = self.samples.back().map(|s| s.captured_at);
        let existing = self.samples.len();
        let mut outcome = MergeOutcome::default();

        for sample in batch {
            let already_held = match tail {
                Some(t) if sample.captured_at < t => true,
                Some(t) if sample.captured_at == t => self.holds_at_tail(existing, &sample),
                _ => false,
            };
            if already_held {
                outcome.skipped += 1;
                continue;
            }
            self.samples.push_back(sample);
            outcome.appended += 1;
        }

        while self.samples.len() > self.cap {
            self.samples.pop_front();
            outcome.evicted += 1;
        }

        outcome
    }

    /// Whether `sample` repeats one of the first `existing` samples that share
    /// the tail timestamp.
    fn holds_at_tail(&self, existing: usize, sample: &LocationSample) -> bool {
        self.samples
            .iter()
            .take(existing)
            .rev()
            .take_while(|held| held.captured_at == sample.captured_at)
            .any(|held| held == sample)
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured maximum length.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Iterate samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &LocationSample> {
        self.samples.iter()
    }

    /// Coordinates of the trail, oldest first.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.samples.iter().map(|s| s.coordinate).collect()
    }

    /// Most recent sample in the trail.
    pub fn latest(&self) -> Option<&LocationSample> {
        self.samples.back()
    }

    /// Owned copy of the trail for rendering.
    pub fn snapshot(&self) -> Vec<LocationSample> {
        self.samples.iter().copied().collect()
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
