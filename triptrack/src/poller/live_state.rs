//! Live telemetry buffers fed by poller ticks.

use crate::coord::Coordinate;
use crate::history::{DeviationWarning, LocationSample, MergeOutcome, PathHistory};
use crate::provider::ProviderError;

use super::{TickReport, TickResults};

/// Which of the three per-tick fetches a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Latest,
    History,
    Warnings,
}

/// Most recent error per fetch kind.
///
/// Each slot holds only the last failure for that kind and is cleared when
/// the kind next succeeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchErrors {
    pub latest: Option<ProviderError>,
    pub history: Option<ProviderError>,
    pub warnings: Option<ProviderError>,
}

impl FetchErrors {
    pub fn get(&self, kind: FetchKind) -> Option<&ProviderError> {
        match kind {
            FetchKind::Latest => self.latest.as_ref(),
            FetchKind::History => self.history.as_ref(),
            FetchKind::Warnings => self.warnings.as_ref(),
        }
    }

    fn slot(&mut self, kind: FetchKind) -> &mut Option<ProviderError> {
        match kind {
            FetchKind::Latest => &mut self.latest,
            FetchKind::History => &mut self.history,
            FetchKind::Warnings => &mut self.warnings,
        }
    }

    /// Number of kinds currently failing.
    pub fn count(&self) -> usize {
        [&self.latest, &self.history, &self.warnings]
            .iter()
            .filter(|e| e.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Outcome of the most recently applied tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickStatus {
    /// No tick applied yet.
    #[default]
    Pending,
    /// All three fetches succeeded.
    Updated,
    /// Some fetches failed; the others were applied.
    PartialFailure,
    /// Every fetch failed.
    Failed,
    /// No trip identity; nothing was fetched.
    MissingIdentity,
}

/// Latest sample, trail, warnings and fetch health for one trip.
#[derive(Debug, Clone)]
pub struct LiveState {
    history: PathHistory,
    latest: Option<LocationSample>,
    warnings: Vec<DeviationWarning>,
    errors: FetchErrors,
    status: TickStatus,
    ticks_applied: u64,
}

impl LiveState {
    /// Create empty buffers with a trail of at most `history_cap` samples.
    pub fn new(history_cap: usize) -> Self {
        Self {
            history: PathHistory::with_cap(history_cap),
            latest: None,
            warnings: Vec::new(),
            errors: FetchErrors::default(),
            status: TickStatus::Pending,
            ticks_applied: 0,
        }
    }

    /// Merge one tick's results.
    pub fn apply(&mut self, report: TickReport) {
        self.ticks_applied += 1;

        let results = match report {
            TickReport::MissingIdentity => {
                self.status = TickStatus::MissingIdentity;
                return;
            }
            TickReport::Fetched(results) => results,
        };

        let TickResults {
            latest,
            history,
            warnings,
        } = results;

        let mut failures = 0;

        match latest {
            Ok(sample) => {
                self.errors.slot(FetchKind::Latest).take();
                if let Some(sample) = sample {
                    self.update_latest(sample);
                }
            }
            Err(e) => {
                failures += 1;
                *self.errors.slot(FetchKind::Latest) = Some(e);
            }
        }

        match history {
            Ok(samples) => {
                self.errors.slot(FetchKind::History).take();
                let MergeOutcome {
                    appended, evicted, ..
                } = self.history.merge(samples);
                tracing::trace!(appended, evicted, len = self.history.len(), "History merged");
            }
            Err(e) => {
                failures += 1;
                *self.errors.slot(FetchKind::History) = Some(e);
            }
        }

        match warnings {
            Ok(warnings) => {
                self.errors.slot(FetchKind::Warnings).take();
                self.warnings = warnings;
            }
            Err(e) => {
                failures += 1;
                *self.errors.slot(FetchKind::Warnings) = Some(e);
            }
        }

        self.status = match failures {
            0 => TickStatus::Updated,
            3 => TickStatus::Failed,
            _ => TickStatus::PartialFailure,
        };
    }

    /// Keep the newer of the current and incoming latest sample.
    fn update_latest(&mut self, sample: LocationSample) {
        match self.latest {
            Some(current) if current.captured_at > sample.captured_at => {}
            _ => self.latest = Some(sample),
        }
    }

    /// Best known vehicle position: the newer of the latest sample and the trail tail.
    pub fn current_position(&self) -> Option<Coordinate> {
        match (self.latest, self.history.latest()) {
            (Some(latest), Some(tail)) if tail.captured_at > latest.captured_at => {
                Some(tail.coordinate)
            }
            (Some(latest), _) => Some(latest.coordinate),
            (None, tail) => tail.map(|s| s.coordinate),
        }
    }

    pub fn history(&self) -> &PathHistory {
        &self.history
    }

    pub fn latest(&self) -> Option<&LocationSample> {
        self.latest.as_ref()
    }

    pub fn warnings(&self) -> &[DeviationWarning] {
        &self.warnings
    }

    pub fn errors(&self) -> &FetchErrors {
        &self.errors
    }

    pub fn status(&self) -> TickStatus {
        self.status
    }

    pub fn ticks_applied(&self) -> u64 {
        self.ticks_applied
    }

    /// Drop every buffered value.
    pub fn clear(&mut self) {
        self.history.clear();
        self.latest = None;
        self.warnings.clear();
        self.errors = FetchErrors::default();
    }
}
