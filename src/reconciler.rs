//! The view-model reconciler is a stateful actor that owns the render-ready
//! state. Collectors and services send it field updates through a
//! [`ReconcilerHandle`]; it applies them in arrival order and publishes the
//! resulting [`ViewModel`] on a `watch` channel for the renderer.

use crate::core::{
    BatteryState, DeviceSnapshot, FieldState, GeoCoordinates, Generation, PointerPosition,
    WeatherSnapshot,
};
use serde::Serialize;
use std::net::IpAddr;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// Everything the renderer shows.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ViewModel {
    pub device: DeviceSnapshot,
    pub battery: FieldState<BatteryState>,
    pub plugins: FieldState<Vec<String>>,
    pub pointer: FieldState<PointerPosition>,
    pub location: Option<GeoCoordinates>,
    pub address: Option<String>,
    pub weather: Option<WeatherSnapshot>,
}

#[derive(Debug)]
enum ViewUpdate {
    Device(DeviceSnapshot),
    PublicIp(IpAddr),
    Battery(FieldState<BatteryState>),
    Plugins(FieldState<Vec<String>>),
    Pointer(FieldState<PointerPosition>),
    Location {
        generation: Generation,
        coordinates: GeoCoordinates,
    },
    Address {
        generation: Generation,
        address: String,
    },
    Weather {
        generation: Generation,
        weather: WeatherSnapshot,
    },
    Snapshot(oneshot::Sender<ViewModel>),
}

/// A cloneable handle with one setter per view-model field.
///
/// Setters never block and never fail; once the reconciler has stopped,
/// updates are dropped.
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    updates_tx: mpsc::UnboundedSender<ViewUpdate>,
    view_rx: watch::Receiver<ViewModel>,
}

impl ReconcilerHandle {
    /// Records navigator details and screen metrics. The public IP, which
    /// arrives separately, is left as it is.
    pub fn set_device(&self, snapshot: DeviceSnapshot) {
        self.send(ViewUpdate::Device(snapshot));
    }

    pub fn set_public_ip(&self, ip: IpAddr) {
        self.send(ViewUpdate::PublicIp(ip));
    }

    pub fn set_battery(&self, battery: FieldState<BatteryState>) {
        self.send(ViewUpdate::Battery(battery));
    }

    pub fn set_plugins(&self, plugins: FieldState<Vec<String>>) {
        self.send(ViewUpdate::Plugins(plugins));
    }

    pub fn set_pointer(&self, pointer: FieldState<PointerPosition>) {
        self.send(ViewUpdate::Pointer(pointer));
    }

    /// Stores coordinates for `generation` unless a newer generation already
    /// stored its own. Clears the address and weather of older coordinates.
    pub fn set_location(&self, generation: Generation, coordinates: GeoCoordinates) {
        self.send(ViewUpdate::Location {
            generation,
            coordinates,
        });
    }

    /// Stores an address, provided `generation` owns the current coordinates.
    pub fn set_address(&self, generation: Generation, address: String) {
        self.send(ViewUpdate::Address {
            generation,
            address,
        });
    }

    /// Stores weather, provided `generation` owns the current coordinates.
    pub fn set_weather(&self, generation: Generation, weather: WeatherSnapshot) {
        self.send(ViewUpdate::Weather {
            generation,
            weather,
        });
    }

    /// A receiver that observes every published view.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.view_rx.clone()
    }

    /// The most recently published view.
    pub fn current(&self) -> ViewModel {
        self.view_rx.borrow().clone()
    }

    /// The view after every update sent before this call has been applied.
    /// Returns `None` if the reconciler has stopped.
    pub async fn snapshot(&self) -> Option<ViewModel> {
        let (tx, rx) = oneshot::channel();
        self.updates_tx.send(ViewUpdate::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    fn send(&self, update: ViewUpdate) {
        if let Err(e) = self.updates_tx.send(update) {
            debug!("Reconciler has stopped, dropping update: {:?}", e.0);
        }
    }
}

/// The `Reconciler` actor.
pub struct Reconciler {
    view: ViewModel,
    /// Generation that stored the current coordinates.
    generation: Option<Generation>,
    updates_rx: mpsc::UnboundedReceiver<ViewUpdate>,
    view_tx: watch::Sender<ViewModel>,
}

impl Reconciler {
    /// Creates the actor and the first handle to it.
    pub fn new() -> (Self, ReconcilerHandle) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewModel::default());
        let reconciler = Self {
            view: ViewModel::default(),
            generation: None,
            updates_rx,
            view_tx,
        };
        (
            reconciler,
            ReconcilerHandle {
                updates_tx,
                view_rx,
            },
        )
    }

    /// Runs the reconciler's main loop until shutdown or until every handle is dropped.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Reconciler received shutdown signal.");
                    break;
                }
                update = self.updates_rx.recv() => {
                    match update {
                        Some(ViewUpdate::Snapshot(reply)) => {
                            let _ = reply.send(self.view.clone());
                        }
                        Some(update) => {
                            if self.apply(update) {
                                self.view_tx.send_replace(self.view.clone());
                            }
                        }
                        None => {
                            info!("All reconciler handles dropped. Shutting down reconciler.");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Applies one update, returning whether the view changed.
    fn apply(&mut self, update: ViewUpdate) -> bool {
        match update {
            ViewUpdate::Device(snapshot) => {
                let public_ip = self.view.device.public_ip;
                self.view.device = DeviceSnapshot {
                    public_ip,
                    ..snapshot
                };
            }
            ViewUpdate::PublicIp(ip) => self.view.device.public_ip = Some(ip),
            ViewUpdate::Battery(battery) => self.view.battery = battery,
            ViewUpdate::Plugins(plugins) => self.view.plugins = plugins,
            ViewUpdate::Pointer(pointer) => self.view.pointer = pointer,
            ViewUpdate::Location {
                generation,
                coordinates,
            } => {
                if self.generation.is_some_and(|current| generation <= current) {
                    debug!(%generation, "Discarding coordinates from a superseded location request.");
                    return false;
                }
                self.generation = Some(generation);
                self.view.location = Some(coordinates);
                self.view.address = None;
                self.view.weather = None;
            }
            ViewUpdate::Address {
                generation,
                address,
            } => {
                if self.generation != Some(generation) {
                    debug!(%generation, "Discarding address for coordinates no longer shown.");
                    return false;
                }
                self.view.address = Some(address);
            }
            ViewUpdate::Weather {
                generation,
                weather,
            } => {
                if self.generation != Some(generation) {
                    debug!(%generation, "Discarding weather for coordinates no longer shown.");
                    return false;
                }
                self.view.weather = Some(weather);
            }
            ViewUpdate::Snapshot(reply) => {
                let _ = reply.send(self.view.clone());
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(latitude: f64, longitude: f64) -> GeoCoordinates {
        GeoCoordinates {
            latitude,
            longitude,
        }
    }

    fn weather(label: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            timezone_name: "UTC".to_string(),
            temperature_f: 50,
            feels_like_f: 48,
            icon_code: "04d".to_string(),
            icon_url: WeatherSnapshot::icon_url_for("04d"),
            description: "broken clouds".to_string(),
            main_category: "Clouds".to_string(),
            coordinates_label: label.to_string(),
        }
    }

    #[test]
    fn test_device_update_keeps_public_ip() {
        let (mut reconciler, _handle) = Reconciler::new();
        let ip: IpAddr = "192.0.2.1".parse().unwrap();
        reconciler.apply(ViewUpdate::PublicIp(ip));
        reconciler.apply(ViewUpdate::Device(DeviceSnapshot {
            user_agent: Some("agent".to_string()),
            ..Default::default()
        }));

        assert_eq!(reconciler.view.device.public_ip, Some(ip));
        assert_eq!(reconciler.view.device.user_agent.as_deref(), Some("agent"));
    }

    #[test]
    fn test_lookups_apply_only_to_current_generation() {
        let (mut reconciler, _handle) = Reconciler::new();
        let (a, b) = (Generation(1), Generation(2));

        assert!(reconciler.apply(ViewUpdate::Location { generation: a, coordinates: coords(1.0, 1.0) }));
        assert!(reconciler.apply(ViewUpdate::Weather { generation: a, weather: weather("1, 1") }));
        assert!(reconciler.apply(ViewUpdate::Location { generation: b, coordinates: coords(2.0, 2.0) }));
        // New coordinates drop what was derived from the old ones.
        assert_eq!(reconciler.view.weather, None);

        assert!(!reconciler.apply(ViewUpdate::Address { generation: a, address: "old".to_string() }));
        assert!(!reconciler.apply(ViewUpdate::Weather { generation: a, weather: weather("1, 1") }));
        assert!(reconciler.apply(ViewUpdate::Address { generation: b, address: "new".to_string() }));

        assert_eq!(reconciler.view.location, Some(coords(2.0, 2.0)));
        assert_eq!(reconciler.view.address.as_deref(), Some("new"));
        assert_eq!(reconciler.view.weather, None);
    }

    #[test]
    fn test_older_coordinates_never_replace_newer() {
        let (mut reconciler, _handle) = Reconciler::new();
        reconciler.apply(ViewUpdate::Location { generation: Generation(5), coordinates: coords(5.0, 5.0) });
        assert!(!reconciler.apply(ViewUpdate::Location { generation: Generation(4), coordinates: coords(4.0, 4.0) }));
        assert!(!reconciler.apply(ViewUpdate::Location { generation: Generation(5), coordinates: coords(9.0, 9.0) }));
        assert_eq!(reconciler.view.location, Some(coords(5.0, 5.0)));
    }

    #[test]
    fn test_lookup_before_any_location_is_ignored() {
        let (mut reconciler, _handle) = Reconciler::new();
        assert!(!reconciler.apply(ViewUpdate::Address { generation: Generation(1), address: "x".to_string() }));
        assert_eq!(reconciler.view, ViewModel::default());
    }

    #[tokio::test]
    async fn test_run_publishes_updates() {
        let (reconciler, handle) = Reconciler::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(reconciler.run(shutdown_rx));

        let mut view_rx = handle.subscribe();
        handle.set_plugins(FieldState::Present(vec!["PDF Viewer".to_string()]));
        handle.set_battery(FieldState::Unsupported);

        let view = handle.snapshot().await.unwrap();
        assert_eq!(view.battery, FieldState::Unsupported);
        assert_eq!(view.plugins.present().map(Vec::len), Some(1));

        view_rx.changed().await.unwrap();
        assert_eq!(handle.current(), view);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert!(handle.snapshot().await.is_none());
    }
}
