#![allow(dead_code)]
//! Test helpers for running a full session against scripted collaborators.

use super::fakes::{FakeGeocoder, FakeIpProvider, FakeWeather};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, time::timeout};
use transparency::{
    app::App,
    capabilities::ScriptedCapabilities,
    config::Config,
    core::{PublicIpProvider, WeatherProvider},
    reconciler::ViewModel,
};

/// A running session plus the handles tests use to drive it.
pub struct TestApp {
    pub app: App,
    pub device: Arc<ScriptedCapabilities>,
    pub geocoder: Arc<FakeGeocoder>,
    pub weather: Option<Arc<FakeWeather>>,
    shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn snapshot(&self) -> ViewModel {
        self.app
            .snapshot()
            .await
            .expect("reconciler should be running")
    }

    /// Waits until the published view satisfies `predicate`.
    pub async fn wait_for_view(&self, predicate: impl FnMut(&ViewModel) -> bool) -> ViewModel {
        let mut rx = self.app.view().subscribe();
        let view = timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("view did not reach the expected state within 2s")
            .expect("reconciler stopped");
        (*view).clone()
    }

    /// Raises the shutdown signal and waits for every session task.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        self.shutdown_tx
            .send(true)
            .expect("Failed to send shutdown signal");
        match timeout(timeout_duration, self.app.run()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
        }
    }
}

pub struct TestAppBuilder {
    pub config: Config,
    device: ScriptedCapabilities,
    ip_provider: Arc<dyn PublicIpProvider>,
    use_fake_weather: bool,
    weather: Option<Arc<dyn WeatherProvider>>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        // Nothing listens here; any request that slips through fails fast.
        config.endpoints.ip_echo_url = "http://127.0.0.1:9/ip".to_string();
        config.endpoints.reverse_geocode_url = "http://127.0.0.1:9/reverse".to_string();
        config.endpoints.weather_url = "http://127.0.0.1:9/weather".to_string();
        config.endpoints.timeout_ms = 500;

        Self {
            config,
            device: ScriptedCapabilities::browser(),
            ip_provider: Arc::new(FakeIpProvider::new("203.0.113.7")),
            use_fake_weather: true,
            weather: None,
        }
    }

    pub fn with_device(mut self, device: ScriptedCapabilities) -> Self {
        self.device = device;
        self
    }

    pub fn with_ip_provider(mut self, provider: Arc<dyn PublicIpProvider>) -> Self {
        self.ip_provider = provider;
        self
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Leaves weather to the configured provider instead of a fake.
    pub fn with_configured_weather(mut self) -> Self {
        self.use_fake_weather = false;
        self
    }

    pub async fn build(self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let device = Arc::new(self.device);
        let geocoder = Arc::new(FakeGeocoder::new());

        let mut builder = App::builder(self.config)
            .device_override(device.clone())
            .ip_provider_override(self.ip_provider)
            .geocoder_override(geocoder.clone());

        let mut fake_weather = None;
        if let Some(weather) = self.weather {
            builder = builder.weather_override(weather);
        } else if self.use_fake_weather {
            let weather = Arc::new(FakeWeather::new());
            builder = builder.weather_override(weather.clone());
            fake_weather = Some(weather);
        }

        let mut app = builder.build(shutdown_rx).await?;
        app.wait_for_initial_probes().await;

        Ok(TestApp {
            app,
            device,
            geocoder,
            weather: fake_weather,
            shutdown_tx,
        })
    }
}
