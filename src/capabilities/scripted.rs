//! A scripted capability surface for tests.

use crate::core::{
    BatteryEvent, BatteryFeed, BatteryState, Capability, DeviceCapabilities, GeoCoordinates,
    NavigatorInfo, PointerPosition, ScreenMetrics,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

type ScriptedPosition = (Capability<GeoCoordinates>, Option<oneshot::Receiver<()>>);

/// A `DeviceCapabilities` whose answers are set up front.
///
/// Subscriptions hand their sending half back to the test through
/// [`battery_events`](Self::battery_events) and
/// [`pointer_events`](Self::pointer_events). Position requests pop queued
/// answers first, optionally held until a gate is released, and fall back to
/// a fixed answer once the queue is empty.
pub struct ScriptedCapabilities {
    navigator: NavigatorInfo,
    screen: Capability<ScreenMetrics>,
    plugins: Capability<Vec<String>>,
    battery: Capability<BatteryState>,
    pointer_supported: bool,
    fallback_position: Capability<GeoCoordinates>,
    queued_positions: Mutex<VecDeque<ScriptedPosition>>,
    battery_tx: Mutex<Option<mpsc::Sender<BatteryEvent>>>,
    pointer_tx: Mutex<Option<mpsc::Sender<PointerPosition>>>,
    position_requests: Mutex<u32>,
}

impl Default for ScriptedCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCapabilities {
    /// A device that supports nothing beyond empty navigator details.
    pub fn new() -> Self {
        Self {
            navigator: NavigatorInfo::default(),
            screen: Capability::Unsupported,
            plugins: Capability::Unsupported,
            battery: Capability::Unsupported,
            pointer_supported: false,
            fallback_position: Capability::Unsupported,
            queued_positions: Mutex::new(VecDeque::new()),
            battery_tx: Mutex::new(None),
            pointer_tx: Mutex::new(None),
            position_requests: Mutex::new(0),
        }
    }

    /// A desktop browser with every capability available.
    pub fn browser() -> Self {
        Self::new()
            .with_navigator(NavigatorInfo {
                user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".to_string()),
                app_version: Some("5.0 (X11)".to_string()),
                platform: Some("Linux x86_64".to_string()),
                language: Some("en-US".to_string()),
                page_url: Some("https://example.test/".to_string()),
            })
            .with_screen(Capability::Available(ScreenMetrics {
                width: 1920,
                height: 1080,
            }))
            .with_plugins(Capability::Available(vec![
                "PDF Viewer".to_string(),
                "Chrome PDF Viewer".to_string(),
            ]))
            .with_battery(Capability::Available(BatteryState {
                level_percent: 76,
                charging: true,
            }))
            .with_pointer(true)
    }

    pub fn with_navigator(mut self, navigator: NavigatorInfo) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_screen(mut self, screen: Capability<ScreenMetrics>) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_plugins(mut self, plugins: Capability<Vec<String>>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_battery(mut self, battery: Capability<BatteryState>) -> Self {
        self.battery = battery;
        self
    }

    pub fn with_pointer(mut self, supported: bool) -> Self {
        self.pointer_supported = supported;
        self
    }

    /// The answer given once no queued answers remain.
    pub fn with_position(mut self, position: Capability<GeoCoordinates>) -> Self {
        self.fallback_position = position;
        self
    }

    /// Queues an answer for the next position request.
    pub fn queue_position(&self, position: Capability<GeoCoordinates>) {
        self.queued_positions
            .lock()
            .unwrap()
            .push_back((position, None));
    }

    /// Queues an answer that is only delivered once the returned sender fires
    /// (or is dropped).
    pub fn queue_gated_position(&self, position: Capability<GeoCoordinates>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.queued_positions
            .lock()
            .unwrap()
            .push_back((position, Some(rx)));
        tx
    }

    /// The sending half of the live battery subscription, if one is active.
    pub fn battery_events(&self) -> Option<mpsc::Sender<BatteryEvent>> {
        self.battery_tx.lock().unwrap().clone()
    }

    /// The sending half of the live pointer subscription, if one is active.
    pub fn pointer_events(&self) -> Option<mpsc::Sender<PointerPosition>> {
        self.pointer_tx.lock().unwrap().clone()
    }

    /// How many times a position was requested.
    pub fn position_requests(&self) -> u32 {
        *self.position_requests.lock().unwrap()
    }
}

#[async_trait]
impl DeviceCapabilities for ScriptedCapabilities {
    fn navigator(&self) -> NavigatorInfo {
        self.navigator.clone()
    }

    fn screen(&self) -> Capability<ScreenMetrics> {
        self.screen.clone()
    }

    fn plugins(&self) -> Capability<Vec<String>> {
        self.plugins.clone()
    }

    async fn battery(&self) -> Capability<BatteryFeed> {
        match &self.battery {
            Capability::Available(initial) => {
                let (tx, events) = mpsc::channel(16);
                *self.battery_tx.lock().unwrap() = Some(tx);
                Capability::Available(BatteryFeed {
                    initial: *initial,
                    events,
                })
            }
            Capability::Unsupported => Capability::Unsupported,
            Capability::Denied => Capability::Denied,
            Capability::Error(reason) => Capability::Error(reason.clone()),
        }
    }

    fn pointer(&self) -> Capability<mpsc::Receiver<PointerPosition>> {
        if !self.pointer_supported {
            return Capability::Unsupported;
        }
        let (tx, rx) = mpsc::channel(64);
        *self.pointer_tx.lock().unwrap() = Some(tx);
        Capability::Available(rx)
    }

    async fn current_position(&self) -> Capability<GeoCoordinates> {
        *self.position_requests.lock().unwrap() += 1;
        let next = self.queued_positions.lock().unwrap().pop_front();
        match next {
            Some((position, Some(gate))) => {
                let _ = gate.await;
                position
            }
            Some((position, None)) => position,
            None => self.fallback_position.clone(),
        }
    }
}
