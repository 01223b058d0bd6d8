//! Track command - follow a consignment's live position until Ctrl+C.

use tokio_util::sync::CancellationToken;
use triptrack::camera::Viewport;
use triptrack::route::RouteSelection;
use triptrack::{SessionSnapshot, SessionStatus, TripRequest};

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the track command.
pub struct TrackArgs {
    pub consignment: String,
    pub pickup: String,
    pub drop: String,
    pub shortest: bool,
}

/// Run the track command.
pub fn run(options: &GlobalOptions, args: TrackArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("track");
    let controller = runner.controller()?;

    let shutdown = CancellationToken::new();
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        shutdown_handler.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let request = TripRequest::new(args.consignment, args.pickup, args.drop);

    runner.runtime().block_on(async {
        let session = controller.activate(request).await;
        if args.shortest {
            session.select_route(RouteSelection::Shortest);
        }

        let initial = session.snapshot();
        print_header(&initial);

        if !session.is_live() {
            println!("Live tracking unavailable; showing static trip view only.");
            return;
        }

        println!("Press Ctrl+C to stop tracking");
        println!();

        let mut updates = session.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    print_tick(&snapshot);
                }
            }
        }

        session.deactivate();
    });

    println!("Tracking stopped.");
    Ok(())
}

fn print_header(snapshot: &SessionSnapshot) {
    println!("TripTrack v{}", triptrack::VERSION);
    println!("================================");
    println!();
    println!("Status:  {}", snapshot.status);
    if let Some(trip) = &snapshot.trip_id {
        println!("Trip:    {}", trip);
    }
    print_endpoint("Pickup", &snapshot.pickup);
    print_endpoint("Drop", &snapshot.drop);

    match (&snapshot.routes, snapshot.selected_route()) {
        (_, Some(route)) => println!(
            "Route:   {} ({:?})",
            route.summary(),
            snapshot.selection
        ),
        (Some(Err(e)), None) => println!("Route:   {}", e),
        _ => println!("Route:   (not requested)"),
    }
    print_viewport(&snapshot.viewport);

    if let SessionStatus::Error(reason) = &snapshot.status {
        println!("Session error: {}", reason);
    }
    println!();
}

fn print_endpoint(
    label: &str,
    endpoint: &Option<Result<triptrack::Coordinate, triptrack::geocoding::GeocodeError>>,
) {
    match endpoint {
        Some(Ok(coord)) => println!("{:<8} {}", format!("{}:", label), coord),
        Some(Err(e)) => println!("{:<8} {}", format!("{}:", label), e),
        None => println!("{:<8} (pending)", format!("{}:", label)),
    }
}

fn print_viewport(viewport: &Viewport) {
    match viewport.region() {
        Some(region) => println!(
            "Frame:   {} (span {:.4}° x {:.4}°)",
            region.center, region.latitude_delta, region.longitude_delta
        ),
        None => println!("Frame:   automatic"),
    }
}

fn print_tick(snapshot: &SessionSnapshot) {
    let position = snapshot
        .current_position()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let reported = snapshot
        .latest
        .map(|s| s.captured_at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "[{}] {:?} | position {} | trail {} | warnings {}",
        reported,
        snapshot.tick_status,
        position,
        snapshot.path.len(),
        snapshot.warnings.len()
    );

    for (kind, error) in [
        ("latest", &snapshot.fetch_errors.latest),
        ("history", &snapshot.fetch_errors.history),
        ("warnings", &snapshot.fetch_errors.warnings),
    ] {
        if let Some(error) = error {
            println!("    {} fetch failed: {}", kind, error);
        }
    }
    if let Some(warning) = snapshot.warnings.last() {
        println!(
            "    last deviation: {:.0} m off route ({})",
            warning.distance_from_route_meters, warning.details
        );
    }
}
