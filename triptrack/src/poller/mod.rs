//! Live location polling.
//!
//! The [`LiveLocationPoller`] periodically fetches the latest position, a
//! bounded history slice and the deviation warnings for one trip, and hands
//! each tick's results to a [`TickSink`].
//!
//! # State Machine
//!
//! ```text
//! Idle --[start(trip)]--> Active --[tick]--> Active
//!                           │
//!                           └--[stop() / handle dropped]--> Stopped
//! ```
//!
//! # Cancellation
//!
//! Ticks are independent and may overlap. Results are delivered while
//! holding the poller's state lock, and [`PollerHandle::stop`] takes the same
//! lock to move to `Stopped`. Once `stop()` returns, no tick fires and no
//! late result reaches the sink.

mod live_state;

pub use live_state::{FetchErrors, FetchKind, LiveState, TickStatus};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::history::{DeviationWarning, LocationSample, DEFAULT_HISTORY_CAP};
use crate::provider::{ProviderError, TripBackend, TripId};

/// Default interval between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of history samples requested per tick.
pub const DEFAULT_HISTORY_LIMIT: usize = DEFAULT_HISTORY_CAP;

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between tick starts.
    pub interval: Duration,
    /// Maximum history samples requested per tick.
    pub history_limit: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Lifecycle of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Active,
    Stopped,
}

/// Results of the three fetches in one tick, each with its own error.
#[derive(Debug, Clone)]
pub struct TickResults {
    pub latest: Result<Option<LocationSample>, ProviderError>,
    pub history: Result<Vec<LocationSample>, ProviderError>,
    pub warnings: Result<Vec<DeviationWarning>, ProviderError>,
}

/// What one tick produced.
#[derive(Debug, Clone)]
pub enum TickReport {
    /// Trip identity unknown; no fetches were made.
    MissingIdentity,
    Fetched(TickResults),
}

/// Receiver of tick results.
///
/// `apply` runs while the poller's state lock is held, so it must not call
/// back into the poller or its handle.
pub trait TickSink: Send + Sync {
    fn apply(&self, tick: u64, report: TickReport);
}

/// Errors from poller control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollerError {
    /// `start` was called on a poller that is not idle.
    #[error("Poller cannot start from state {0:?}")]
    NotIdle(PollerState),

    /// The configured interval is zero.
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,
}

/// State shared between the poller, its handle and in-flight ticks.
struct PollerShared {
    state: Mutex<PollerState>,
    cancel: CancellationToken,
    ticks_started: AtomicU64,
    ticks_delivered: AtomicU64,
    ticks_discarded: AtomicU64,
}

impl PollerShared {
    /// Deliver a tick's results unless the poller has stopped.
    fn deliver(&self, tick: u64, report: TickReport, sink: &dyn TickSink) {
        let state = self.state.lock();
        if *state != PollerState::Active {
            self.ticks_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(tick, "Discarding late tick result after stop");
            return;
        }
        sink.apply(tick, report);
        self.ticks_delivered.fetch_add(1, Ordering::Relaxed);
    }
}

/// Periodic fetcher of live trip telemetry.
pub struct LiveLocationPoller {
    backend: Arc<dyn TripBackend>,
    config: PollerConfig,
    shared: Arc<PollerShared>,
}

impl LiveLocationPoller {
    pub fn new(backend: Arc<dyn TripBackend>, config: PollerConfig) -> Self {
        Self {
            backend,
            config,
            shared: Arc::new(PollerShared {
                state: Mutex::new(PollerState::Idle),
                cancel: CancellationToken::new(),
                ticks_started: AtomicU64::new(0),
                ticks_delivered: AtomicU64::new(0),
                ticks_discarded: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> PollerState {
        *self.shared.state.lock()
    }

    /// Begin polling `trip_id` on the current tokio runtime.
    ///
    /// With `trip_id == None` every tick reports
    /// [`TickReport::MissingIdentity`] without fetching. The first tick fires
    /// immediately. A zero interval is rejected and leaves the poller idle.
    pub fn start(
        &self,
        trip_id: Option<TripId>,
        sink: Arc<dyn TickSink>,
    ) -> Result<PollerHandle, PollerError> {
        if self.config.interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        {
            let mut state = self.shared.state.lock();
            if *state != PollerState::Idle {
                return Err(PollerError::NotIdle(*state));
            }
            *state = PollerState::Active;
        }

        tracing::info!(
            trip = trip_id.as_ref().map(TripId::as_str).unwrap_or("<none>"),
            interval_ms = self.config.interval.as_millis() as u64,
            history_limit = self.config.history_limit,
            "Live location polling started"
        );

        let task = tokio::spawn(run_loop(
            Arc::clone(&self.backend),
            self.config.clone(),
            trip_id,
            sink,
            Arc::clone(&self.shared),
        ));

        Ok(PollerHandle {
            shared: Arc::clone(&self.shared),
            task: Mutex::new(Some(task)),
        })
    }
}

/// Control handle for a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    shared: Arc<PollerShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollerHandle {
    /// Stop polling. Idempotent.
    ///
    /// Waits for any tick currently delivering results; after return no
    /// further results are delivered.
    pub fn stop(&self) {
        let was_active = {
            let mut state = self.shared.state.lock();
            let was_active = *state == PollerState::Active;
            *state = PollerState::Stopped;
            was_active
        };

        self.shared.cancel.cancel();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }

        if was_active {
            tracing::info!(
                ticks = self.shared.ticks_started.load(Ordering::Relaxed),
                "Live location polling stopped"
            );
        }
    }

    pub fn state(&self) -> PollerState {
        *self.shared.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == PollerState::Active
    }

    /// Ticks issued so far.
    pub fn ticks_started(&self) -> u64 {
        self.shared.ticks_started.load(Ordering::Relaxed)
    }

    /// Ticks whose results reached the sink.
    pub fn ticks_delivered(&self) -> u64 {
        self.shared.ticks_delivered.load(Ordering::Relaxed)
    }

    /// Ticks whose results arrived after stop and were dropped.
    pub fn ticks_discarded(&self) -> u64 {
        self.shared.ticks_discarded.load(Ordering::Relaxed)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("state", &self.state())
            .field("ticks_started", &self.ticks_started())
            .finish_non_exhaustive()
    }
}

async fn run_loop(
    backend: Arc<dyn TripBackend>,
    config: PollerConfig,
    trip_id: Option<TripId>,
    sink: Arc<dyn TickSink>,
    shared: Arc<PollerShared>,
) {
    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = interval.tick() => {
                let tick = shared.ticks_started.fetch_add(1, Ordering::Relaxed) + 1;
                in_flight.spawn(run_tick(
                    tick,
                    Arc::clone(&backend),
                    trip_id.clone(),
                    config.history_limit,
                    Arc::clone(&sink),
                    Arc::clone(&shared),
                ));
            }
            Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = result {
                    if e.is_panic() {
                        tracing::warn!(error = %e, "Poll tick panicked");
                    }
                }
            }
        }
    }

    in_flight.abort_all();
}

async fn run_tick(
    tick: u64,
    backend: Arc<dyn TripBackend>,
    trip_id: Option<TripId>,
    history_limit: usize,
    sink: Arc<dyn TickSink>,
    shared: Arc<PollerShared>,
) {
    let report = match &trip_id {
        None => {
            tracing::debug!(tick, "Poll tick skipped: trip identity missing");
            TickReport::MissingIdentity
        }
        Some(trip_id) => {
            let (latest, history, warnings) = tokio::join!(
                backend.fetch_latest_location(trip_id),
                backend.fetch_location_history(trip_id, history_limit),
                backend.fetch_deviation_warnings(trip_id),
            );

            for (kind, error) in [
                (FetchKind::Latest, latest.as_ref().err()),
                (FetchKind::History, history.as_ref().err()),
                (FetchKind::Warnings, warnings.as_ref().err()),
            ] {
                if let Some(error) = error {
                    tracing::warn!(tick, trip = %trip_id, ?kind, %error, "Poll fetch failed");
                }
            }
            tracing::debug!(
                tick,
                trip = %trip_id,
                history = history.as_ref().map(Vec::len).unwrap_or(0),
                warnings = warnings.as_ref().map(Vec::len).unwrap_or(0),
                "Poll tick fetched"
            );

            TickReport::Fetched(TickResults {
                latest,
                history,
                warnings,
            })
        }
    };

    shared.deliver(tick, report, sink.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::provider::BoxFuture;
    use chrono::{TimeZone, Utc};

    /// Backend whose fetches take `delay` and return a sample stamped with
    /// the call number.
    struct SlowBackend {
        delay: Duration,
        calls: AtomicU64,
    }

    impl SlowBackend {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                calls: AtomicU64::new(0),
            })
        }
    }

    fn stamped(n: u64) -> LocationSample {
        LocationSample::new(
            Coordinate::new(51.5, -0.12).unwrap(),
            Utc.timestamp_opt(1_700_000_000 + n as i64, 0).unwrap(),
        )
    }

    impl TripBackend for SlowBackend {
        fn fetch_trip_id_for_consignment<'a>(
            &'a self,
            _consignment_id: &'a str,
        ) -> BoxFuture<'a, Result<Option<TripId>, ProviderError>> {
            Box::pin(async { Ok(None) })
        }

        fn fetch_latest_location<'a>(
            &'a self,
            _trip_id: &'a TripId,
        ) -> BoxFuture<'a, Result<Option<LocationSample>, ProviderError>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                Ok(Some(stamped(n)))
            })
        }

        fn fetch_location_history<'a>(
            &'a self,
            _trip_id: &'a TripId,
            _limit: usize,
        ) -> BoxFuture<'a, Result<Vec<LocationSample>, ProviderError>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                Ok(vec![])
            })
        }

        fn fetch_deviation_warnings<'a>(
            &'a self,
            _trip_id: &'a TripId,
        ) -> BoxFuture<'a, Result<Vec<DeviationWarning>, ProviderError>> {
            Box::pin(async { Err(ProviderError::HttpError("warnings offline".into())) })
        }
    }

    /// Sink that records ticks into a [`LiveState`].
    struct RecordingSink {
        live: Mutex<LiveState>,
        ticks: Mutex<Vec<u64>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                live: Mutex::new(LiveState::new(200)),
                ticks: Mutex::new(Vec::new()),
            })
        }
    }

    impl TickSink for RecordingSink {
        fn apply(&self, tick: u64, report: TickReport) {
            self.ticks.lock().push(tick);
            self.live.lock().apply(report);
        }
    }

    fn config(interval_secs: u64) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(interval_secs),
            history_limit: 50,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_machine() {
        let poller = LiveLocationPoller::new(SlowBackend::new(Duration::ZERO), config(10));
        assert_eq!(poller.state(), PollerState::Idle);

        let handle = poller.start(Some(TripId::new("t1")), RecordingSink::new()).unwrap();
        assert_eq!(poller.state(), PollerState::Active);
        assert!(handle.is_active());

        handle.stop();
        assert_eq!(poller.state(), PollerState::Stopped);

        // Stop is idempotent and a stopped poller cannot restart
        handle.stop();
        assert_eq!(
            poller.start(None, RecordingSink::new()).unwrap_err(),
            PollerError::NotIdle(PollerState::Stopped)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_rejected() {
        let sink = RecordingSink::new();
        let poller = LiveLocationPoller::new(SlowBackend::new(Duration::ZERO), config(0));

        let err = poller
            .start(Some(TripId::new("t1")), sink.clone())
            .unwrap_err();
        assert_eq!(err, PollerError::ZeroInterval);
        assert_eq!(poller.state(), PollerState::Idle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(sink.ticks.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_fixed_interval() {
        let backend = SlowBackend::new(Duration::ZERO);
        let sink = RecordingSink::new();
        let poller = LiveLocationPoller::new(backend, config(10));
        let handle = poller.start(Some(TripId::new("t1")), sink.clone()).unwrap();

        // Ticks at t=0, 10, 20
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(handle.ticks_started(), 3);
        assert_eq!(sink.ticks.lock().len(), 3);

        let live = sink.live.lock();
        assert!(live.latest().is_some());
        assert_eq!(live.status(), TickStatus::PartialFailure);
        assert!(live.errors().get(FetchKind::Warnings).is_some());
        drop(live);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_identity_reports_status() {
        let backend = SlowBackend::new(Duration::ZERO);
        let sink = RecordingSink::new();
        let poller = LiveLocationPoller::new(backend.clone(), config(10));
        let handle = poller.start(None, sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.live.lock().status(), TickStatus::MissingIdentity);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_after_stop_is_discarded() {
        // Fetches take 501ms. Measured from 1ms after start, the second tick
        // is issued at 9.999s and would resolve at 10.5s; stop lands at 10.001s.
        let backend = SlowBackend::new(Duration::from_millis(501));
        let sink = RecordingSink::new();
        let poller = LiveLocationPoller::new(backend, config(10));
        let handle = poller.start(Some(TripId::new("t1")), sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert_eq!(handle.ticks_started(), 2);
        handle.stop();

        let delivered_at_stop = sink.ticks.lock().clone();
        let latest_at_stop = sink.live.lock().latest().copied();
        assert_eq!(delivered_at_stop, vec![1]);

        // Well past the in-flight result and the next would-be tick
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(*sink.ticks.lock(), delivered_at_stop);
        assert_eq!(sink.live.lock().latest().copied(), latest_at_stop);
        assert_eq!(handle.ticks_started(), 2);
        assert_eq!(handle.ticks_delivered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ticks_are_allowed() {
        // Fetches outlast the interval, so ticks overlap
        let backend = SlowBackend::new(Duration::from_secs(25));
        let sink = RecordingSink::new();
        let poller = LiveLocationPoller::new(backend, config(10));
        let handle = poller.start(Some(TripId::new("t1")), sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(handle.ticks_started(), 3);
        assert!(sink.ticks.lock().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*sink.ticks.lock(), vec![1]);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let backend = SlowBackend::new(Duration::ZERO);
        let sink = RecordingSink::new();
        let poller = LiveLocationPoller::new(backend, config(10));
        let handle = poller.start(Some(TripId::new("t1")), sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(poller.state(), PollerState::Stopped);
        assert_eq!(sink.ticks.lock().len(), 1);
    }
}
