#![allow(dead_code)]
//! In-memory stand-ins for the outbound lookup services.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;
use transparency::core::{
    GeoCoordinates, PublicIpProvider, ReverseGeocoder, WeatherProvider, WeatherSnapshot,
};
use transparency::lookup::LookupError;

fn key(coordinates: GeoCoordinates) -> String {
    format!("{:.4},{:.4}", coordinates.latitude, coordinates.longitude)
}

#[derive(Debug)]
pub struct FakeIpProvider {
    ip: IpAddr,
    fail: AtomicBool,
}

impl FakeIpProvider {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: ip.parse().expect("valid test IP"),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let provider = Self::new("0.0.0.0");
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }
}

#[async_trait]
impl PublicIpProvider for FakeIpProvider {
    async fn public_ip(&self) -> Result<IpAddr, LookupError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LookupError::Status {
                service: "ip-echo",
                status: 503,
            });
        }
        Ok(self.ip)
    }
}

/// Answers `"Address of <lat>,<lon>"`, or fails when told to.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn address_of(coordinates: GeoCoordinates) -> String {
        format!("Address of {}", key(coordinates))
    }
}

#[async_trait]
impl ReverseGeocoder for FakeGeocoder {
    async fn reverse(&self, coordinates: GeoCoordinates) -> Result<String, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LookupError::Status {
                service: "reverse-geocode",
                status: 500,
            });
        }
        Ok(Self::address_of(coordinates))
    }
}

/// Returns a snapshot derived from the coordinates. Answers for a given
/// coordinate pair can be held back with [`FakeWeather::hold`].
#[derive(Debug, Default)]
pub struct FakeWeather {
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the next answer for `coordinates` until the returned sender
    /// fires or is dropped.
    pub fn hold(&self, coordinates: GeoCoordinates) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key(coordinates), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn snapshot_for(coordinates: GeoCoordinates) -> WeatherSnapshot {
        WeatherSnapshot {
            timezone_name: format!("Zone {}", key(coordinates)),
            temperature_f: coordinates.latitude.floor() as i64,
            feels_like_f: coordinates.longitude.floor() as i64,
            icon_code: "01d".to_string(),
            icon_url: WeatherSnapshot::icon_url_for("01d"),
            description: "clear sky".to_string(),
            main_category: "Clear".to_string(),
            coordinates_label: coordinates.to_string(),
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(&self, coordinates: GeoCoordinates) -> Result<WeatherSnapshot, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(&key(coordinates));
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(Self::snapshot_for(coordinates))
    }
}
