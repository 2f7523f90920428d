//! Seams between the engine and its external collaborators
//!
//! The engine never talks to a concrete map provider, data store or
//! geocoding service directly. Each is reached through one of these traits so
//! a browser binding, a native renderer or a test double can stand in.

use async_trait::async_trait;

use crate::{
    core::{
        bounds::Bounds,
        geo::{LatLng, LatLngBounds, Point},
    },
    data::entity::{GeoEntity, OwnerProfile, PostDraft},
    layers::marker::{MarkerId, MarkerOptions},
    provider::loader::ScriptLoadError,
    Result,
};

/// World-plane projection of a live map instance
///
/// Providers usually only expose this once tiles are ready; until then
/// [`MapBackend::projection`] returns `None`.
pub trait MapProjection {
    /// Projects a coordinate onto the zoom-0 world plane
    fn project_to_world(&self, lat_lng: &LatLng) -> Result<Point>;

    /// Current map center
    fn current_center(&self) -> LatLng;

    /// Current zoom level
    fn current_zoom(&self) -> f64;
}

/// Options for a programmatic viewport fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub padding: f64,
    pub max_zoom: Option<f64>,
}

/// A map instance as seen by the marker engine
pub trait MapBackend {
    /// Places a marker on the map and returns its handle
    fn add_marker(&mut self, options: MarkerOptions) -> Result<MarkerId>;

    /// Detaches a marker from the map. Unknown handles are ignored.
    fn remove_marker(&mut self, marker: MarkerId);

    /// Repositions a placed marker. Fails with `NotFound` for unknown handles.
    fn move_marker(&mut self, marker: MarkerId, position: LatLng) -> Result<()>;

    /// Recenters the map without changing zoom
    fn pan_to(&mut self, center: LatLng);

    /// Moves the viewport so the bounds are fully visible
    fn fit_bounds(&mut self, bounds: &LatLngBounds, options: FitOptions);

    /// The live projection, if the provider has one ready
    fn projection(&self) -> Option<&dyn MapProjection>;

    /// Page-space rectangle of the map container
    fn container_rect(&self) -> Bounds;
}

/// Read side of the post store
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Current posts, newest first
    async fn fetch_entities(&self) -> Result<Vec<GeoEntity>>;

    /// Batch lookup of owner display names
    async fn fetch_display_names(&self, _owner_ids: &[String]) -> Result<Vec<OwnerProfile>> {
        Ok(Vec::new())
    }
}

/// Write side of the post store
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create(&self, draft: PostDraft) -> Result<GeoEntity>;

    async fn update(&self, id: &str, draft: PostDraft) -> Result<GeoEntity>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Free-text address lookups
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Address to coordinate. Blank queries resolve to `None`.
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>>;

    /// Coordinate to a display address
    async fn reverse(&self, lat_lng: &LatLng) -> Result<Option<String>>;
}

/// Injects the map provider's script into the host page
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Resolves once the script has loaded
    async fn inject(&self, src: &str) -> std::result::Result<(), ScriptLoadError>;
}
