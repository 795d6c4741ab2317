//! Battery collector: initial reading plus live updates for the session.

use crate::core::{BatteryEvent, BatteryState, Capability, DeviceCapabilities, FieldState};
use crate::reconciler::ReconcilerHandle;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Folds one change event into the current battery state.
pub fn apply_battery_event(state: BatteryState, event: BatteryEvent) -> BatteryState {
    match event {
        BatteryEvent::LevelChanged(fraction) => BatteryState {
            level_percent: BatteryState::level_from_fraction(fraction),
            ..state
        },
        BatteryEvent::LevelPercent(level) => BatteryState {
            level_percent: level.min(100),
            ..state
        },
        BatteryEvent::ChargingChanged(charging) => BatteryState { charging, ..state },
    }
}

/// Probes the battery and, if supported, follows its change events until
/// shutdown. The subscription is released when this task returns.
///
/// `probed` fires once the first battery state (or its absence) is recorded.
pub async fn follow_battery(
    device: Arc<dyn DeviceCapabilities>,
    view: ReconcilerHandle,
    mut shutdown_rx: watch::Receiver<bool>,
    probed: oneshot::Sender<()>,
) {
    let capability = tokio::select! {
        biased;
        _ = shutdown_rx.changed() => return,
        capability = device.battery() => capability,
    };

    let mut feed = match capability {
        Capability::Available(feed) => feed,
        Capability::Unsupported => {
            info!("Battery API not supported.");
            view.set_battery(FieldState::Unsupported);
            return;
        }
        Capability::Denied => {
            warn!("Battery access denied.");
            view.set_battery(FieldState::Unavailable);
            return;
        }
        Capability::Error(reason) => {
            warn!("Battery probe failed: {}", reason);
            view.set_battery(FieldState::Unavailable);
            return;
        }
    };

    let mut state = feed.initial;
    view.set_battery(FieldState::Present(state));
    let _ = probed.send(());

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                debug!("Battery collector received shutdown, unsubscribing.");
                break;
            }
            event = feed.events.recv() => match event {
                Some(event) => {
                    state = apply_battery_event(state, event);
                    view.set_battery(FieldState::Present(state));
                }
                None => {
                    debug!("Battery feed closed by the device.");
                    break;
                }
            }
        }
    }
}
