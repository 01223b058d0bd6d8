//! Tracking session orchestration.
//!
//! A [`TrackingSession`] backs one trip-detail view. The
//! [`TrackingSessionController`] builds it in this order:
//!
//! ```text
//! ┌ trip identity lookup ┐
//! ├ geocode pickup       ┤  (concurrent)
//! └ geocode drop         ┘
//!            │
//!            ▼
//! request routes (only when both endpoints resolved)
//!            │
//!            ▼
//! initial viewport ──► start poller (only with a trip identity)
//! ```
//!
//! Every poller tick is merged into the session state under one lock, the
//! camera is re-fitted from the merged state, and a fresh
//! [`SessionSnapshot`] is published to subscribers through a
//! `tokio::sync::watch` channel.

mod snapshot;

pub use snapshot::{SessionSnapshot, SessionStatus};

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::camera::{fit_with, FitOptions, Viewport};
use crate::config::TrackingConfig;
use crate::coord::Coordinate;
use crate::geocoding::{GeocodeError, GeocodingPipeline};
use crate::poller::{
    LiveLocationPoller, LiveState, PollerError, PollerHandle, TickReport, TickSink,
};
use crate::provider::{DirectionsProvider, Geocoder, TripBackend, TripId};
use crate::route::{RouteError, RouteRequestEngine, RouteSelection, RouteSet};

/// What a trip-detail view asks to track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRequest {
    pub consignment_id: String,
    pub pickup_address: String,
    pub drop_address: String,
}

impl TripRequest {
    pub fn new(
        consignment_id: impl Into<String>,
        pickup_address: impl Into<String>,
        drop_address: impl Into<String>,
    ) -> Self {
        Self {
            consignment_id: consignment_id.into(),
            pickup_address: pickup_address.into(),
            drop_address: drop_address.into(),
        }
    }
}

/// Mutable session state, guarded by [`SessionShared::state`].
struct SessionState {
    status: SessionStatus,
    trip_id: Option<TripId>,
    pickup: Option<Result<Coordinate, GeocodeError>>,
    drop: Option<Result<Coordinate, GeocodeError>>,
    routes: Option<Result<RouteSet, RouteError>>,
    selection: RouteSelection,
    live: LiveState,
    viewport: Viewport,
    revision: u64,
    closed: bool,
}

impl SessionState {
    fn new(history_cap: usize) -> Self {
        Self {
            status: SessionStatus::Loading,
            trip_id: None,
            pickup: None,
            drop: None,
            routes: None,
            selection: RouteSelection::default(),
            live: LiveState::new(history_cap),
            viewport: Viewport::Automatic,
            revision: 0,
            closed: false,
        }
    }

    fn pickup(&self) -> Option<Coordinate> {
        self.pickup.as_ref().and_then(|r| r.as_ref().ok()).copied()
    }

    fn drop_point(&self) -> Option<Coordinate> {
        self.drop.as_ref().and_then(|r| r.as_ref().ok()).copied()
    }

    fn route_set(&self) -> Option<&RouteSet> {
        self.routes.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// Recompute the viewport from the current merged state.
    fn refit(&mut self, options: &FitOptions) {
        let points: Vec<Coordinate> = [self.pickup(), self.drop_point(), self.live.current_position()]
            .into_iter()
            .flatten()
            .collect();
        let polyline = self
            .route_set()
            .map(|set| set.selected(self.selection).polyline.as_slice());

        self.viewport = fit_with(&points, polyline, options);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            revision: self.revision,
            status: self.status.clone(),
            trip_id: self.trip_id.clone(),
            pickup: self.pickup.clone(),
            drop: self.drop.clone(),
            routes: self.routes.clone(),
            selection: self.selection,
            viewport: self.viewport,
            latest: self.live.latest().copied(),
            path: self.live.history().snapshot(),
            warnings: self.live.warnings().to_vec(),
            fetch_errors: self.live.errors().clone(),
            tick_status: self.live.status(),
        }
    }
}

/// State shared between the session, its poller and subscribers.
struct SessionShared {
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
    fit: FitOptions,
}

impl SessionShared {
    /// Apply `change` and publish the result, unless the session is closed.
    fn update(&self, change: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        change(&mut state);
        state.refit(&self.fit);
        state.revision += 1;
        self.updates.send_replace(state.snapshot());
        true
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }
}

impl TickSink for SessionShared {
    fn apply(&self, tick: u64, report: TickReport) {
        let applied = self.update(|state| state.live.apply(report));
        if applied {
            tracing::trace!(tick, "Tick merged into session");
        }
    }
}

/// Builds tracking sessions from external collaborators.
#[derive(Clone)]
pub struct TrackingSessionController {
    geocoding: GeocodingPipeline,
    routes: RouteRequestEngine,
    backend: Arc<dyn TripBackend>,
    config: TrackingConfig,
}

impl TrackingSessionController {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        directions: Arc<dyn DirectionsProvider>,
        backend: Arc<dyn TripBackend>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            geocoding: GeocodingPipeline::new(geocoder),
            routes: RouteRequestEngine::new(directions),
            backend,
            config,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Start tracking a trip.
    ///
    /// Never fails: every missing piece is reported through the snapshot.
    /// Must be called within a tokio runtime.
    pub async fn activate(&self, request: TripRequest) -> TrackingSession {
        let (updates, _) = watch::channel(SessionSnapshot::loading());
        let shared = Arc::new(SessionShared {
            state: Mutex::new(SessionState::new(self.config.history_cap)),
            updates,
            fit: self.config.fit_options(),
        });

        tracing::info!(consignment = %request.consignment_id, "Activating tracking session");

        let (identity, (pickup, drop)) = tokio::join!(
            self.resolve_identity(&request.consignment_id),
            self.geocoding
                .resolve_pair(&request.pickup_address, &request.drop_address),
        );

        let routes = match (&pickup, &drop) {
            (Ok(origin), Ok(destination)) => Some(
                self.routes
                    .request_routes(*origin, *destination, self.config.want_alternates)
                    .await,
            ),
            _ => {
                tracing::debug!("Skipping route request: endpoints unresolved");
                None
            }
        };

        let (status, trip_id) = match identity {
            Ok(Some(trip_id)) => (SessionStatus::Ready, Some(trip_id)),
            Ok(None) => (SessionStatus::Degraded, None),
            Err(reason) => (SessionStatus::Error(reason), None),
        };

        shared.update(|state| {
            state.status = status.clone();
            state.trip_id = trip_id.clone();
            state.pickup = Some(pickup);
            state.drop = Some(drop);
            state.routes = routes;
        });

        let (status, poller) = match trip_id {
            Some(trip_id) => match self.start_poller(trip_id, &shared) {
                Ok(handle) => (status, Some(handle)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start live location polling");
                    let status = SessionStatus::Error(format!("live tracking unavailable: {}", e));
                    shared.update(|state| state.status = status.clone());
                    (status, None)
                }
            },
            None => (status, None),
        };

        tracing::info!(
            consignment = %request.consignment_id,
            ?status,
            live = poller.is_some(),
            "Tracking session active"
        );

        TrackingSession {
            consignment_id: request.consignment_id,
            shared,
            poller,
        }
    }

    async fn resolve_identity(&self, consignment_id: &str) -> Result<Option<TripId>, String> {
        if consignment_id.trim().is_empty() {
            return Ok(None);
        }
        match self
            .backend
            .fetch_trip_id_for_consignment(consignment_id)
            .await
        {
            Ok(Some(trip_id)) => Ok(Some(trip_id)),
            Ok(None) => {
                tracing::info!(consignment = consignment_id, "No trip linked; live tracking unavailable");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(consignment = consignment_id, error = %e, "Trip lookup failed");
                Err(e.to_string())
            }
        }
    }

    fn start_poller(
        &self,
        trip_id: TripId,
        shared: &Arc<SessionShared>,
    ) -> Result<PollerHandle, PollerError> {
        let poller = LiveLocationPoller::new(Arc::clone(&self.backend), self.config.poller_config());
        let sink: Arc<dyn TickSink> = Arc::clone(shared) as Arc<dyn TickSink>;
        poller.start(Some(trip_id), sink)
    }
}

/// One trip's live tracking state. Dropping it tears the session down.
pub struct TrackingSession {
    consignment_id: String,
    shared: Arc<SessionShared>,
    poller: Option<PollerHandle>,
}

impl TrackingSession {
    pub fn consignment_id(&self) -> &str {
        &self.consignment_id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.state.lock().status.clone()
    }

    /// Whether live polling is running.
    pub fn is_live(&self) -> bool {
        self.poller.as_ref().is_some_and(PollerHandle::is_active)
    }

    /// Switch between the primary and the shortest route and re-fit.
    pub fn select_route(&self, selection: RouteSelection) {
        self.shared.update(|state| state.selection = selection);
    }

    /// Stop polling, then discard buffered state.
    pub fn deactivate(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Stop before clearing so no tick lands on discarded buffers
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }

        let mut state = self.shared.state.lock();
        if !state.closed {
            state.closed = true;
            state.live.clear();
            tracing::info!(consignment = %self.consignment_id, "Tracking session closed");
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("consignment_id", &self.consignment_id)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
