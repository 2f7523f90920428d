//! # postmap
//!
//! Marker reconciliation and overlay positioning for map-centric listing apps.
//!
//! The crate coordinates an existing map provider: it keeps one marker per
//! geotagged post, fits the viewport once on first data, projects a clicked
//! marker into page space for a custom popup, and keeps the post list fresh
//! by polling a remote source.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod provider;
pub mod services;
pub mod sync;
pub mod traits;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    config::PostmapConfig,
    fit::ViewportController,
    geo::{LatLng, LatLngBounds, Point},
    projector::ScreenProjector,
    viewport::Viewport,
};

pub use data::entity::{Category, CategoryFilter, GeoEntity, OwnerProfile, PostDraft};

pub use layers::{
    marker::{Marker, MarkerId, MarkerOptions},
    reconciler::{MarkerReconciler, ReconcileMode, ReconcileOutcome},
};

pub use input::events::{DismissReason, KeyCode, MapEvent};

pub use provider::{headless::HeadlessMap, loader::ProviderLoader};

pub use traits::{EntitySource, EntityStore, Geocoder, MapBackend, MapProjection, ScriptInjector};

pub use ui::{map_view::MapView, picker::LocationPicker, popup::PopupOverlay};

pub use sync::snapshot::Snapshot;

#[cfg(feature = "tokio-runtime")]
pub use sync::poller::{PollingSynchronizer, SyncHandle};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Projection unavailable: {0}")]
    Projection(String),

    #[error("Entity source error: {0}")]
    Source(String),

    #[error("Map provider script failed to load: {0}")]
    ScriptLoad(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
