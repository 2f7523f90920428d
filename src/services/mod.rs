//! Outbound HTTP services

pub mod geocode;

pub use geocode::NominatimGeocoder;

use once_cell::sync::Lazy;
use std::time::Duration;

/// Shared async HTTP client for the backend and geocoder
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});
