//! Signal collectors.
//!
//! Each collector reads one category of local signal and hands the result,
//! or an explicit absence, to the reconciler. Collectors run independently:
//! a probe that fails or is unsupported never holds up the others.

pub mod battery;
pub mod pointer;

use crate::core::{Capability, DeviceCapabilities, DeviceSnapshot, PublicIpProvider};
use crate::reconciler::ReconcilerHandle;
use crate::task_manager::TaskManager;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Starts every signal collector for one session.
pub struct SignalCollectors {
    device: Arc<dyn DeviceCapabilities>,
    ip_provider: Arc<dyn PublicIpProvider>,
    view: ReconcilerHandle,
}

impl SignalCollectors {
    pub fn new(
        device: Arc<dyn DeviceCapabilities>,
        ip_provider: Arc<dyn PublicIpProvider>,
        view: ReconcilerHandle,
    ) -> Self {
        Self {
            device,
            ip_provider,
            view,
        }
    }

    /// Captures the synchronous signals immediately and spawns the
    /// asynchronous ones (public IP, battery, pointer) on `task_manager`.
    pub fn start(&self, task_manager: &TaskManager) -> InitialProbes {
        self.capture_device();
        self.capture_plugins();

        let (ip_done, ip_settled) = oneshot::channel();
        task_manager.spawn(
            "PublicIpCollector",
            collect_public_ip(
                self.ip_provider.clone(),
                self.view.clone(),
                task_manager.get_shutdown_rx(),
                ip_done,
            ),
        );
        let (battery_done, battery_settled) = oneshot::channel();
        task_manager.spawn(
            "BatteryCollector",
            battery::follow_battery(
                self.device.clone(),
                self.view.clone(),
                task_manager.get_shutdown_rx(),
                battery_done,
            ),
        );
        task_manager.spawn(
            "PointerCollector",
            pointer::follow_pointer(
                self.device.clone(),
                self.view.clone(),
                task_manager.get_shutdown_rx(),
            ),
        );

        InitialProbes {
            pending: vec![ip_settled, battery_settled],
        }
    }

    fn capture_device(&self) {
        let screen = match self.device.screen() {
            Capability::Available(metrics) => Some(metrics),
            other => {
                debug!(?other, "Screen metrics not available.");
                None
            }
        };
        self.view
            .set_device(DeviceSnapshot::capture(self.device.navigator(), screen));
    }

    fn capture_plugins(&self) {
        let plugins = self.device.plugins().into_field(|names| names);
        match plugins.present() {
            Some(names) => debug!(count = names.len(), "Enumerated plugins."),
            None => info!("Plugin registry not available."),
        }
        self.view.set_plugins(plugins);
    }
}

/// Completes once every one-shot probe has delivered its first answer,
/// whether that answer was a value, an absence or a failure.
pub struct InitialProbes {
    pending: Vec<oneshot::Receiver<()>>,
}

impl InitialProbes {
    pub async fn settled(self) {
        // A dropped sender means the probe ended early, which also counts.
        join_all(self.pending).await;
    }
}

/// Looks up the public IP once. Failures are logged and leave the field empty.
async fn collect_public_ip(
    provider: Arc<dyn PublicIpProvider>,
    view: ReconcilerHandle,
    mut shutdown_rx: watch::Receiver<bool>,
    done: oneshot::Sender<()>,
) {
    tokio::select! {
        biased;
        _ = shutdown_rx.changed() => {
            debug!("Public IP lookup abandoned on shutdown.");
        }
        result = provider.public_ip() => match result {
            Ok(ip) => {
                info!(%ip, "Public IP resolved.");
                view.set_public_ip(ip);
            }
            Err(e) => warn!("Failed to fetch public IP: {}", e),
        }
    }
    let _ = done.send(());
}
