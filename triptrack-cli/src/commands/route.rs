//! Route command - request driving routes between two addresses.

use triptrack::geocoding::GeocodingPipeline;
use triptrack::route::{RouteRequestEngine, RouteSet};

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the route command.
pub struct RouteArgs {
    pub from: String,
    pub to: String,
    pub alternates: Option<bool>,
}

/// Run the route command.
pub fn run(options: &GlobalOptions, args: RouteArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("route");

    let want_alternates = args
        .alternates
        .unwrap_or(runner.config().tracking.want_alternates);
    let geocoding = GeocodingPipeline::new(runner.geocoder());
    let engine = RouteRequestEngine::new(runner.directions());

    let routes = runner.runtime().block_on(engine.request_routes_between_addresses(
        &geocoding,
        &args.from,
        &args.to,
        want_alternates,
    ))?;

    print_routes(&routes);
    Ok(())
}

fn print_routes(routes: &RouteSet) {
    let shortest = routes.shortest_index();
    println!("{} route(s) found", routes.len());
    for (index, candidate) in routes.candidates().iter().enumerate() {
        let mut tags = Vec::new();
        if index == 0 {
            tags.push("primary");
        }
        if index == shortest {
            tags.push("shortest");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        println!(
            "  #{} {} ({} points){}",
            index + 1,
            candidate.summary(),
            candidate.polyline.len(),
            tags
        );
    }
}
