//! Read-only view of a tracking session.

use std::fmt;

use crate::camera::Viewport;
use crate::coord::Coordinate;
use crate::geocoding::GeocodeError;
use crate::history::{DeviationWarning, LocationSample};
use crate::poller::{FetchErrors, TickStatus};
use crate::provider::TripId;
use crate::route::{RouteCandidate, RouteError, RouteSelection, RouteSet};

/// Overall session health.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Startup lookups still running.
    #[default]
    Loading,
    /// Trip identity known and live polling running.
    Ready,
    /// No trip linked to the consignment; static view only.
    Degraded,
    /// Trip lookup failed, or live polling could not start.
    Error(String),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Ready => write!(f, "ready"),
            SessionStatus::Degraded => write!(f, "degraded (no live tracking)"),
            SessionStatus::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// Everything a trip-detail view renders, captured at one revision.
///
/// `pickup`, `drop` and `routes` are `None` until startup finishes. Routes
/// are never requested unless both endpoints resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Increments on every published change.
    pub revision: u64,
    pub status: SessionStatus,
    pub trip_id: Option<TripId>,
    pub pickup: Option<Result<Coordinate, GeocodeError>>,
    pub drop: Option<Result<Coordinate, GeocodeError>>,
    pub routes: Option<Result<RouteSet, RouteError>>,
    pub selection: RouteSelection,
    pub viewport: Viewport,
    pub latest: Option<LocationSample>,
    /// Trail, oldest first.
    pub path: Vec<LocationSample>,
    pub warnings: Vec<DeviationWarning>,
    pub fetch_errors: FetchErrors,
    pub tick_status: TickStatus,
}

impl SessionSnapshot {
    pub(crate) fn loading() -> Self {
        Self {
            revision: 0,
            status: SessionStatus::Loading,
            trip_id: None,
            pickup: None,
            drop: None,
            routes: None,
            selection: RouteSelection::default(),
            viewport: Viewport::Automatic,
            latest: None,
            path: Vec::new(),
            warnings: Vec::new(),
            fetch_errors: FetchErrors::default(),
            tick_status: TickStatus::Pending,
        }
    }

    pub fn pickup_coordinate(&self) -> Option<Coordinate> {
        self.pickup.as_ref().and_then(|r| r.as_ref().ok()).copied()
    }

    pub fn drop_coordinate(&self) -> Option<Coordinate> {
        self.drop.as_ref().and_then(|r| r.as_ref().ok()).copied()
    }

    pub fn route_set(&self) -> Option<&RouteSet> {
        self.routes.as_ref().and_then(|r| r.as_ref().ok())
    }

    pub fn route_error(&self) -> Option<&RouteError> {
        self.routes.as_ref().and_then(|r| r.as_ref().err())
    }

    /// The route currently drawn, if any.
    pub fn selected_route(&self) -> Option<&RouteCandidate> {
        self.route_set().map(|set| set.selected(self.selection))
    }

    /// Newest known vehicle position from the latest sample or the trail.
    pub fn current_position(&self) -> Option<Coordinate> {
        let tail = self.path.last();
        match (self.latest.as_ref(), tail) {
            (Some(latest), Some(tail)) if tail.captured_at > latest.captured_at => {
                Some(tail.coordinate)
            }
            (Some(latest), _) => Some(latest.coordinate),
            (None, tail) => tail.map(|s| s.coordinate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_loading_snapshot_is_empty() {
        let snapshot = SessionSnapshot::loading();
        assert_eq!(snapshot.status, SessionStatus::Loading);
        assert!(snapshot.viewport.is_automatic());
        assert!(snapshot.selected_route().is_none());
        assert!(snapshot.current_position().is_none());
    }

    #[test]
    fn test_current_position_uses_newer_trail_tail() {
        let mut snapshot = SessionSnapshot::loading();
        let older = LocationSample::new(
            Coordinate::new(1.0, 1.0).unwrap(),
            Utc.timestamp_opt(100, 0).unwrap(),
        );
        let newer = LocationSample::new(
            Coordinate::new(2.0, 2.0).unwrap(),
            Utc.timestamp_opt(200, 0).unwrap(),
        );
        snapshot.latest = Some(older);
        snapshot.path = vec![older, newer];
        assert_eq!(snapshot.current_position(), Some(newer.coordinate));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Ready.to_string(), "ready");
        assert_eq!(
            SessionStatus::Error("timeout".into()).to_string(),
            "error: timeout"
        );
    }
}
