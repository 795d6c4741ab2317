//! Core domain types and service traits for Transparency
//!
//! This module defines the signals the application gathers, the render-ready
//! field states, and the trait contracts for the device capability surface
//! and the outbound lookup services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use tokio::sync::mpsc;

use crate::lookup::LookupError;

// =============================================================================
// Signals
// =============================================================================

/// Screen dimensions in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub width: u32,
    pub height: u32,
}

/// Locally readable navigator details, captured once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NavigatorInfo {
    pub user_agent: Option<String>,
    pub app_version: Option<String>,
    pub platform: Option<String>,
    pub language: Option<String>,
    pub page_url: Option<String>,
}

/// Everything known about the visiting device, captured once per session.
///
/// `public_ip` is contributed separately by the IP-echo probe and stays
/// `None` if that lookup fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceSnapshot {
    pub public_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub app_version: Option<String>,
    pub platform: Option<String>,
    pub screen: Option<ScreenMetrics>,
    pub language: Option<String>,
    pub page_url: Option<String>,
}

impl DeviceSnapshot {
    /// Builds a snapshot from navigator details and optional screen metrics.
    pub fn capture(navigator: NavigatorInfo, screen: Option<ScreenMetrics>) -> Self {
        Self {
            public_ip: None,
            user_agent: navigator.user_agent,
            app_version: navigator.app_version,
            platform: navigator.platform,
            screen,
            language: navigator.language,
            page_url: navigator.page_url,
        }
    }
}

/// Absorbs f32/f64 representation error in reported charge fractions.
const FRACTION_TOLERANCE: f64 = 1e-4;

/// Battery charge and charging flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatteryState {
    /// Charge level, 0 to 100.
    pub level_percent: u8,
    pub charging: bool,
}

impl BatteryState {
    /// Converts a device-reported charge fraction (0.0..=1.0) to a whole
    /// percentage, rounding down. Fractions that are a float error below a
    /// whole percent (0.57 reads as 56.99...) count as that percent.
    pub fn level_from_fraction(fraction: f64) -> u8 {
        (fraction * 100.0 + FRACTION_TOLERANCE)
            .floor()
            .clamp(0.0, 100.0) as u8
    }
}

/// A change reported by a battery subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryEvent {
    /// The charge fraction changed (0.0..=1.0).
    LevelChanged(f64),
    /// The charge changed, already as a whole percentage.
    LevelPercent(u8),
    ChargingChanged(bool),
}

/// An active battery subscription: the state at subscription time plus a
/// stream of change events. Dropping `events` unsubscribes.
#[derive(Debug)]
pub struct BatteryFeed {
    pub initial: BatteryState,
    pub events: mpsc::Receiver<BatteryEvent>,
}

/// Pointer coordinates in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

/// A geographic position acquired through the permission-gated location capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for GeoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Normalized current weather for one coordinate pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    pub timezone_name: String,
    pub temperature_f: i64,
    pub feels_like_f: i64,
    pub icon_code: String,
    /// Image for `icon_code`, see [`WeatherSnapshot::icon_url_for`].
    pub icon_url: String,
    pub description: String,
    pub main_category: String,
    pub coordinates_label: String,
}

impl WeatherSnapshot {
    /// URL of the icon image for a weather icon code.
    pub fn icon_url_for(icon_code: &str) -> String {
        format!("https://openweathermap.org/img/w/{}.png", icon_code)
    }
}

/// Identifies one location request. Later requests carry larger generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Field and capability states
// =============================================================================

/// Render state of a single view-model field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FieldState<T> {
    /// Not probed yet.
    Pending,
    /// The device does not offer this capability.
    Unsupported,
    /// The capability exists but was denied or failed.
    Unavailable,
    Present(T),
}

impl<T> Default for FieldState<T> {
    fn default() -> Self {
        FieldState::Pending
    }
}

impl<T> FieldState<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            FieldState::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Result of probing a device capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability<T> {
    Available(T),
    Unsupported,
    Denied,
    Error(String),
}

impl<T> Capability<T> {
    /// Collapses the probe result into a field state, mapping the value with `f`.
    pub fn into_field<U>(self, f: impl FnOnce(T) -> U) -> FieldState<U> {
        match self {
            Capability::Available(value) => FieldState::Present(f(value)),
            Capability::Unsupported => FieldState::Unsupported,
            Capability::Denied | Capability::Error(_) => FieldState::Unavailable,
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// The device capability surface the collectors and location service probe.
///
/// Every method may report `Unsupported`; callers treat that as a valid
/// terminal state for the corresponding field.
#[async_trait]
pub trait DeviceCapabilities: Send + Sync {
    /// User agent, platform, locale and page details.
    fn navigator(&self) -> NavigatorInfo;

    /// Screen size in pixels.
    fn screen(&self) -> Capability<ScreenMetrics>;

    /// Names of installed plugins, in the order the device reports them.
    fn plugins(&self) -> Capability<Vec<String>>;

    /// Subscribes to battery status. The subscription lives until the
    /// returned receiver is dropped.
    async fn battery(&self) -> Capability<BatteryFeed>;

    /// Subscribes to pointer-move events. The subscription lives until the
    /// returned receiver is dropped.
    fn pointer(&self) -> Capability<mpsc::Receiver<PointerPosition>>;

    /// Asks for the current position. May wait on a user permission decision.
    async fn current_position(&self) -> Capability<GeoCoordinates>;
}

/// Reports the public IP address the outside world sees.
#[async_trait]
pub trait PublicIpProvider: Send + Sync {
    async fn public_ip(&self) -> Result<IpAddr, LookupError>;
}

/// Resolves coordinates to a human-readable address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coordinates: GeoCoordinates) -> Result<String, LookupError>;
}

/// Fetches current weather for coordinates.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, coordinates: GeoCoordinates) -> Result<WeatherSnapshot, LookupError>;
}
