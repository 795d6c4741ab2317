//! The main application logic, decoupled from the entry point.

use crate::{
    capabilities::HostCapabilities,
    collectors::{InitialProbes, SignalCollectors},
    config::Config,
    core::{DeviceCapabilities, PublicIpProvider, ReverseGeocoder, WeatherProvider},
    location::{LocationError, LocationReport, LocationService},
    lookup::{self, IpEchoClient, NominatimGeocoder},
    reconciler::{Reconciler, ReconcilerHandle, ViewModel},
    task_manager::TaskManager,
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{info, instrument};

/// A running session: collectors started, reconciler live, location on demand.
pub struct App {
    task_manager: TaskManager,
    view: ReconcilerHandle,
    location: Arc<LocationService>,
    initial_probes: Option<InitialProbes>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Handle for reading (or, in tests, writing) the view-model.
    pub fn view(&self) -> &ReconcilerHandle {
        &self.view
    }

    /// The location action.
    pub async fn locate(&self) -> Result<LocationReport, LocationError> {
        self.location.request_location().await
    }

    /// The view after every update sent so far has been applied.
    pub async fn snapshot(&self) -> Option<ViewModel> {
        self.view.snapshot().await
    }

    /// Waits until the public IP and battery probes have answered once.
    /// Later calls return immediately.
    pub async fn wait_for_initial_probes(&mut self) {
        if let Some(probes) = self.initial_probes.take() {
            probes.settled().await;
        }
    }

    /// The location service, for callers that trigger it from several tasks.
    pub fn location_service(&self) -> Arc<LocationService> {
        self.location.clone()
    }

    /// Waits for the shutdown signal, then tears down every subscription and task.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        // Already signalled, or the sender is gone: either way, stop.
        if !*shutdown_rx.borrow_and_update() {
            shutdown_rx.changed().await.ok();
        }
        info!("Shutdown signal received. Tearing down session...");

        self.task_manager.shutdown().await;
        info!("Session ended.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Every external collaborator can be overridden, which is how the tests
/// swap in scripted devices and fake services.
pub struct AppBuilder {
    config: Config,
    device_override: Option<Arc<dyn DeviceCapabilities>>,
    ip_provider_override: Option<Arc<dyn PublicIpProvider>>,
    geocoder_override: Option<Arc<dyn ReverseGeocoder>>,
    weather_override: Option<Arc<dyn WeatherProvider>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            device_override: None,
            ip_provider_override: None,
            geocoder_override: None,
            weather_override: None,
        }
    }

    /// Overrides the device capability surface.
    pub fn device_override(mut self, device: Arc<dyn DeviceCapabilities>) -> Self {
        self.device_override = Some(device);
        self
    }

    /// Overrides the public IP lookup.
    pub fn ip_provider_override(mut self, provider: Arc<dyn PublicIpProvider>) -> Self {
        self.ip_provider_override = Some(provider);
        self
    }

    /// Overrides the reverse geocoder.
    pub fn geocoder_override(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.geocoder_override = Some(geocoder);
        self
    }

    /// Overrides the weather provider, bypassing the API key check.
    pub fn weather_override(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather_override = Some(weather);
        self
    }

    /// Builds the session: starts the reconciler and every signal collector.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Services
        // =========================================================================
        let http = lookup::http_client(&config.endpoints)?;

        let device = self.device_override.unwrap_or_else(|| {
            Arc::new(HostCapabilities::new(
                config.location.clone(),
                Duration::from_secs(config.battery.poll_interval_seconds.max(1)),
            )) as Arc<dyn DeviceCapabilities>
        });
        let ip_provider = self.ip_provider_override.unwrap_or_else(|| {
            Arc::new(IpEchoClient::new(
                http.clone(),
                config.endpoints.ip_echo_url.clone(),
            )) as Arc<dyn PublicIpProvider>
        });
        let geocoder = self.geocoder_override.unwrap_or_else(|| {
            Arc::new(NominatimGeocoder::new(
                http.clone(),
                config.endpoints.reverse_geocode_url.clone(),
            )) as Arc<dyn ReverseGeocoder>
        });
        let weather = match self.weather_override {
            Some(weather) => weather,
            None => lookup::health::startup_check(&config, http.clone()),
        };

        // =========================================================================
        // 2. Reconciler
        // =========================================================================
        let (reconciler, view) = Reconciler::new();
        task_manager.spawn("Reconciler", reconciler.run(task_manager.get_shutdown_rx()));

        // =========================================================================
        // 3. Signal collectors
        // =========================================================================
        let initial_probes =
            SignalCollectors::new(device.clone(), ip_provider, view.clone()).start(&task_manager);

        let location = Arc::new(LocationService::new(
            device,
            geocoder,
            weather,
            view.clone(),
        ));

        info!("Session started with {} background tasks.", task_manager.len());

        Ok(App {
            task_manager,
            view,
            location,
            initial_probes: Some(initial_probes),
        })
    }
}
