//! Capabilities of the machine the binary runs on.
//!
//! A native host has no pointer stream, plugin registry or screen in the
//! browser sense, so those report `Unsupported`. Location comes from
//! configuration, with `consent` standing in for the permission prompt.

use crate::config::LocationConfig;
use crate::core::{
    BatteryEvent, BatteryFeed, BatteryState, Capability, DeviceCapabilities, GeoCoordinates,
    NavigatorInfo, PointerPosition, ScreenMetrics,
};
use async_trait::async_trait;
use battery::units::ratio::ratio;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

pub struct HostCapabilities {
    location: LocationConfig,
    battery_poll: Duration,
}

impl HostCapabilities {
    pub fn new(location: LocationConfig, battery_poll: Duration) -> Self {
        Self {
            location,
            battery_poll,
        }
    }
}

#[async_trait]
impl DeviceCapabilities for HostCapabilities {
    fn navigator(&self) -> NavigatorInfo {
        NavigatorInfo {
            user_agent: Some(format!(
                "{}/{} ({}; {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            )),
            app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            platform: System::long_os_version().or_else(System::name),
            language: ["LC_ALL", "LC_MESSAGES", "LANG"]
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find_map(|value| locale_to_language_tag(&value)),
            page_url: std::env::current_dir()
                .ok()
                .map(|dir| format!("file://{}", dir.display())),
        }
    }

    fn screen(&self) -> Capability<ScreenMetrics> {
        Capability::Unsupported
    }

    fn plugins(&self) -> Capability<Vec<String>> {
        Capability::Unsupported
    }

    async fn battery(&self) -> Capability<BatteryFeed> {
        let initial = match tokio::task::spawn_blocking(read_battery).await {
            Ok(Ok(Some(state))) => state,
            Ok(Ok(None)) => return Capability::Unsupported,
            Ok(Err(e)) => return Capability::Error(e.to_string()),
            Err(e) => return Capability::Error(e.to_string()),
        };

        let (tx, events) = mpsc::channel(16);
        tokio::spawn(poll_battery(initial, self.battery_poll, tx));
        Capability::Available(BatteryFeed { initial, events })
    }

    fn pointer(&self) -> Capability<mpsc::Receiver<PointerPosition>> {
        Capability::Unsupported
    }

    async fn current_position(&self) -> Capability<GeoCoordinates> {
        if !self.location.consent {
            return Capability::Denied;
        }
        match (self.location.latitude, self.location.longitude) {
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    return Capability::Error(format!(
                        "coordinates out of range: {}, {}",
                        latitude, longitude
                    ));
                }
                Capability::Available(GeoCoordinates {
                    latitude,
                    longitude,
                })
            }
            _ => Capability::Unsupported,
        }
    }
}

/// Reads the first battery the OS reports, if any.
fn read_battery() -> Result<Option<BatteryState>, battery::Error> {
    let manager = battery::Manager::new()?;
    let mut batteries = manager.batteries()?;
    let cell = match batteries.next() {
        Some(cell) => cell?,
        None => return Ok(None),
    };

    Ok(Some(BatteryState {
        level_percent: BatteryState::level_from_fraction(
            cell.state_of_charge().get::<ratio>() as f64,
        ),
        charging: matches!(cell.state(), battery::State::Charging),
    }))
}

/// Re-reads the battery until the subscriber goes away, emitting an event per change.
async fn poll_battery(mut last: BatteryState, period: Duration, tx: mpsc::Sender<BatteryEvent>) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and `last` is already current.
    timer.tick().await;

    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!("Battery subscriber dropped, stopping host battery poll.");
                break;
            }
            _ = timer.tick() => {
                let current = match tokio::task::spawn_blocking(read_battery).await {
                    Ok(Ok(Some(state))) => state,
                    Ok(Ok(None)) => continue,
                    Ok(Err(e)) => {
                        warn!("Failed to read host battery: {}", e);
                        continue;
                    }
                    Err(e) => {
                        warn!("Battery read task failed: {}", e);
                        continue;
                    }
                };

                let events = battery_changes(last, current);
                last = current;

                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Events that take a subscriber from `last` to `current`.
fn battery_changes(last: BatteryState, current: BatteryState) -> Vec<BatteryEvent> {
    let mut events = Vec::new();
    if current.level_percent != last.level_percent {
        events.push(BatteryEvent::LevelPercent(current.level_percent));
    }
    if current.charging != last.charging {
        events.push(BatteryEvent::ChargingChanged(current.charging));
    }
    events
}

/// Turns a POSIX locale such as `en_US.UTF-8` into a language tag (`en-US`).
fn locale_to_language_tag(locale: &str) -> Option<String> {
    let name = locale.split(&['.', '@'][..]).next()?.trim();
    if name.is_empty() || name == "C" || name == "POSIX" {
        return None;
    }
    Some(name.replace('_', "-"))
}
