//! Pointer collector: the last known pointer position, overwritten on every move.

use crate::core::{Capability, DeviceCapabilities, FieldState};
use crate::reconciler::ReconcilerHandle;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Follows pointer-move events until shutdown. The listener is released
/// when this task returns.
pub async fn follow_pointer(
    device: Arc<dyn DeviceCapabilities>,
    view: ReconcilerHandle,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut moves = match device.pointer() {
        Capability::Available(moves) => moves,
        other => {
            info!("Pointer events not available.");
            view.set_pointer(other.into_field(|_| Default::default()));
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                debug!("Pointer collector received shutdown, removing listener.");
                break;
            }
            position = moves.recv() => match position {
                Some(position) => view.set_pointer(FieldState::Present(position)),
                None => break,
            }
        }
    }
}
