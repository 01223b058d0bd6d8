//! TripTrack - live geospatial tracking for delivery trips
//!
//! This library resolves pickup and drop addresses, requests driving routes
//! between them, polls a vehicle's live position, and keeps a map viewport
//! framing everything that matters for one trip.
//!
//! The entry point is [`session::TrackingSessionController`], which composes
//! the building blocks:
//!
//! - [`geocoding`]: address to coordinate
//! - [`route`]: driving routes with primary and shortest selection
//! - [`camera`]: viewport fitting
//! - [`poller`]: periodic live telemetry fetches
//! - [`history`]: bounded vehicle trail
//!
//! External services sit behind the traits in [`provider`].

pub mod camera;
pub mod config;
pub mod coord;
pub mod geocoding;
pub mod history;
pub mod logging;
pub mod poller;
pub mod provider;
pub mod route;
pub mod session;

pub use coord::Coordinate;
pub use session::{
    SessionSnapshot, SessionStatus, TrackingSession, TrackingSessionController, TripRequest,
};

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
