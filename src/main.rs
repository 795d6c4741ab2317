//! Transparency - a data transparency tool
//!
//! Shows what the current device reveals about itself: network identity,
//! navigator details, battery, pointer and, on request, location and weather.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use transparency::{
    app::App,
    cli::Cli,
    config::Config,
    formatting::{formatter_for, ViewFormatter},
    location::LocationError,
    reconciler::ViewModel,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    // Logs go to stderr so stdout carries only the rendered view.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Transparency starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Output Format: {}", config.output.format);
    info!("IP Echo URL: {}", config.endpoints.ip_echo_url);
    info!("Reverse Geocode URL: {}", config.endpoints.reverse_geocode_url);
    info!("Weather URL: {}", config.endpoints.weather_url);
    info!("Request Timeout: {}ms", config.endpoints.timeout_ms);
    info!("Temperature Conversion: {}", config.weather.conversion);
    info!(
        "Weather API Key: {}",
        if config.weather.api_key().is_some() {
            "Configured"
        } else {
            "Not configured"
        }
    );
    info!(
        "Location Consent: {}",
        if config.location.consent {
            "Granted"
        } else {
            "Denied"
        }
    );
    info!(
        "Battery Poll Interval: {}s",
        config.battery.poll_interval_seconds
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut app = App::builder(config.clone()).build(shutdown_rx).await?;
    let formatter = formatter_for(config.output.format);

    app.wait_for_initial_probes().await;

    if cli.locate {
        match app.locate().await {
            Ok(report) => {
                info!(
                    generation = %report.generation,
                    coordinates = %report.coordinates,
                    "Location resolved."
                );
                if let Err(e) = &report.address {
                    warn!("Address unavailable: {}", e);
                }
                if let Err(e) = &report.weather {
                    warn!("Weather unavailable: {}", e);
                }
            }
            Err(LocationError::Denied) => {
                warn!("Location permission denied; location fields stay empty.")
            }
            Err(e) => warn!("Location unavailable: {}", e),
        }
    }

    match app.snapshot().await {
        Some(view) => print_view(formatter.as_ref(), &view),
        None => error!("View-model is no longer available."),
    }

    if let Some(seconds) = cli.watch {
        watch_view(&app, formatter.as_ref(), Duration::from_secs(seconds)).await;
    }

    // Send shutdown signal to all tasks
    if shutdown_tx.send(true).is_err() {
        warn!("All session tasks already stopped.");
    }
    app.run().await?;

    info!("Shutdown complete.");
    Ok(())
}

fn print_view(formatter: &dyn ViewFormatter, view: &ViewModel) {
    println!("{}", formatter.format(view));
}

/// Re-renders the view on every change until `duration` elapses or Ctrl-C.
async fn watch_view(app: &App, formatter: &dyn ViewFormatter, duration: Duration) {
    let mut updates = app.view().subscribe();
    updates.borrow_and_update();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    info!("Watching for changes for {}s...", duration.as_secs());
    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Shutting down gracefully...");
                break;
            }
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                print_view(formatter, &view);
            }
        }
    }
}
