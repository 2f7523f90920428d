//! Prelude module for common postmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use postmap::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{PostmapConfig, SyncConfig, ViewportConfig},
    fit::ViewportController,
    geo::{LatLng, LatLngBounds, Point},
    projector::ScreenProjector,
    viewport::Viewport,
};

pub use crate::data::{
    entity::{Category, CategoryFilter, GeoEntity, OwnerProfile, PostDraft},
    source::InMemoryEntityStore,
};

pub use crate::layers::{
    marker::{Marker, MarkerId, MarkerOptions},
    reconciler::{MarkerReconciler, ReconcileMode, ReconcileOutcome},
};

pub use crate::input::events::{DismissReason, EventHandled, EventQueue, KeyCode, MapEvent};

pub use crate::provider::{HeadlessMap, ProviderLoader};

pub use crate::services::geocode::NominatimGeocoder;

pub use crate::sync::Snapshot;

#[cfg(feature = "tokio-runtime")]
pub use crate::sync::{PollingSynchronizer, SyncHandle, SyncStats};

pub use crate::traits::{
    EntitySource, EntityStore, FitOptions, Geocoder, MapBackend, MapProjection, ScriptInjector,
};

pub use crate::ui::{
    map_view::MapView,
    picker::LocationPicker,
    popup::{PopupContent, PopupOverlay},
};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
