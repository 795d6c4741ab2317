//! Command-Line Interface (CLI) argument parsing.
//!
//! Arguments are parsed at startup and merged on top of the configuration
//! file and environment variables as the highest-priority figment provider.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Shows what a device reveals about itself: network, platform, battery,
/// location and local weather.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request the device location, then resolve its address and weather.
    #[arg(long)]
    pub locate: bool,

    /// Latitude reported by the host location capability.
    #[arg(long, value_name = "DEGREES", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude reported by the host location capability.
    #[arg(long, value_name = "DEGREES", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Refuse location permission.
    #[arg(long)]
    pub deny_location: bool,

    /// Print the view as JSON.
    #[arg(long)]
    pub json: bool,

    /// Keep printing view updates for this many seconds instead of exiting
    /// after the first snapshot.
    #[arg(long, value_name = "SECONDS")]
    pub watch: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if self.json {
            let mut output = Dict::new();
            output.insert("format".into(), Value::from("Json"));
            dict.insert("output".into(), Value::Dict(Tag::Default, output));
        }

        let mut location = Dict::new();
        if let Some(lat) = self.lat {
            location.insert("latitude".into(), Value::from(lat));
        }
        if let Some(lon) = self.lon {
            location.insert("longitude".into(), Value::from(lon));
        }
        // Only an explicit denial overrides the configured consent.
        if self.deny_location {
            location.insert("consent".into(), Value::from(false));
        }
        if !location.is_empty() {
            dict.insert("location".into(), Value::Dict(Tag::Default, location));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
