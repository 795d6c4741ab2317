//! Transparency - shows a visitor what their device gives away
//!
//! This library gathers device, network, battery and pointer signals,
//! resolves location into an address and current weather on request, and
//! reconciles everything into a single render-ready view-model.

pub mod app;
pub mod capabilities;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod core;
pub mod formatting;
pub mod location;
pub mod lookup;
pub mod reconciler;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
