//! The location action: acquire coordinates through the permission-gated
//! capability, then resolve the address and the weather for them.
//!
//! Every request carries a [`Generation`]. Coordinates are only stored if no
//! newer request has stored its own, storing them aborts the lookups still
//! running for older coordinates, and the reconciler drops any lookup result
//! whose generation no longer owns the displayed coordinates.

use crate::core::{
    Capability, DeviceCapabilities, GeoCoordinates, Generation, ReverseGeocoder, WeatherProvider,
    WeatherSnapshot,
};
use crate::lookup::LookupError;
use crate::reconciler::ReconcilerHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,

    #[error("location is not supported on this device")]
    Unsupported,

    #[error("location unavailable: {0}")]
    Device(String),

    #[error("location request {0} was superseded by a newer request")]
    Superseded(Generation),

    #[error("location lookups for request {generation} failed: {reason}")]
    Interrupted {
        generation: Generation,
        reason: String,
    },
}

/// What one successful location request produced.
#[derive(Debug)]
pub struct LocationReport {
    pub generation: Generation,
    pub coordinates: GeoCoordinates,
    pub address: Result<String, LookupError>,
    pub weather: Result<WeatherSnapshot, LookupError>,
}

pub struct LocationService {
    device: Arc<dyn DeviceCapabilities>,
    geocoder: Arc<dyn ReverseGeocoder>,
    weather: Arc<dyn WeatherProvider>,
    view: ReconcilerHandle,
    issued: AtomicU64,
    /// The generation whose coordinates are stored, and its lookup task.
    current: Mutex<Option<(Generation, AbortHandle)>>,
}

impl LocationService {
    pub fn new(
        device: Arc<dyn DeviceCapabilities>,
        geocoder: Arc<dyn ReverseGeocoder>,
        weather: Arc<dyn WeatherProvider>,
        view: ReconcilerHandle,
    ) -> Self {
        Self {
            device,
            geocoder,
            weather,
            view,
            issued: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Requests the device location and, once granted, resolves address and
    /// weather concurrently for those coordinates.
    ///
    /// Denial, an unsupported capability or a device error leave the view
    /// untouched. Lookup failures are part of the report rather than errors.
    #[instrument(skip(self))]
    pub async fn request_location(&self) -> Result<LocationReport, LocationError> {
        let generation = Generation(self.issued.fetch_add(1, Ordering::SeqCst) + 1);
        info!(%generation, "Requesting device location.");

        let coordinates = match self.device.current_position().await {
            Capability::Available(coordinates) => coordinates,
            Capability::Denied => {
                warn!(%generation, "Location permission denied.");
                return Err(LocationError::Denied);
            }
            Capability::Unsupported => {
                warn!(%generation, "Location is not supported.");
                return Err(LocationError::Unsupported);
            }
            Capability::Error(reason) => {
                warn!(%generation, "Location request failed: {}", reason);
                return Err(LocationError::Device(reason));
            }
        };

        let lookups = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((stored, previous)) = current.as_ref() {
                if *stored > generation {
                    info!(%generation, newer = %stored, "Coordinates arrived after a newer request; discarding.");
                    return Err(LocationError::Superseded(generation));
                }
                previous.abort();
            }

            info!(%generation, %coordinates, "Location acquired.");
            self.view.set_location(generation, coordinates);
            let lookups = tokio::spawn(run_lookups(
                generation,
                coordinates,
                self.geocoder.clone(),
                self.weather.clone(),
                self.view.clone(),
            ));
            *current = Some((generation, lookups.abort_handle()));
            lookups
        };

        match lookups.await {
            Ok((address, weather)) => Ok(LocationReport {
                generation,
                coordinates,
                address,
                weather,
            }),
            Err(e) if e.is_cancelled() => {
                info!(%generation, "Lookups aborted by a newer location request.");
                Err(LocationError::Superseded(generation))
            }
            Err(e) => Err(LocationError::Interrupted {
                generation,
                reason: e.to_string(),
            }),
        }
    }
}

/// Resolves address and weather for one generation's coordinates, concurrently.
async fn run_lookups(
    generation: Generation,
    coordinates: GeoCoordinates,
    geocoder: Arc<dyn ReverseGeocoder>,
    weather: Arc<dyn WeatherProvider>,
    view: ReconcilerHandle,
) -> (Result<String, LookupError>, Result<WeatherSnapshot, LookupError>) {
    let address = async {
        let result = geocoder.reverse(coordinates).await;
        match &result {
            Ok(address) => view.set_address(generation, address.clone()),
            Err(e) => warn!(%generation, "Reverse geocoding failed: {}", e),
        }
        result
    };

    let current_weather = async {
        let result = weather.current(coordinates).await;
        match &result {
            Ok(snapshot) => view.set_weather(generation, snapshot.clone()),
            Err(e) => warn!(%generation, "Weather lookup failed: {}", e),
        }
        result
    };

    tokio::join!(address, current_weather)
}
