//! Implementations of the device capability surface.

pub mod host;

pub use host::HostCapabilities;

#[cfg(feature = "test-utils")]
pub mod scripted;

#[cfg(feature = "test-utils")]
pub use scripted::ScriptedCapabilities;
