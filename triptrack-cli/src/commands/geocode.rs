//! Geocode command - resolve a single address.

use triptrack::geocoding::GeocodingPipeline;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Run the geocode command.
pub fn run(options: &GlobalOptions, address: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("geocode");

    let pipeline = GeocodingPipeline::new(runner.geocoder());
    let coordinate = runner.runtime().block_on(pipeline.resolve(address))?;

    println!("{}", coordinate);
    Ok(())
}
