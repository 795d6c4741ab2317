#![allow(dead_code)]
pub mod app;
pub mod fakes;

use std::time::Duration;
use transparency::core::GeoCoordinates;

pub const BERLIN: GeoCoordinates = GeoCoordinates {
    latitude: 52.52,
    longitude: 13.405,
};

pub const LISBON: GeoCoordinates = GeoCoordinates {
    latitude: 38.7223,
    longitude: -9.1393,
};

/// Polls `condition` until it holds, panicking after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition was not met within 2s");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
