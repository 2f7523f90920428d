use crate::core::constants::{MAX_LATITUDE, MAX_ZOOM, MIN_ZOOM};
use crate::core::geo::{LatLng, LatLngBounds, Point};
use serde::{Deserialize, Serialize};

/// Manages the current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the map container in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            size,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Sets the center of the viewport, clamped to the projectable world
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            center.lng.clamp(-180.0, 180.0),
        );
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Projects a LatLng to world pixel coordinates at the given zoom level
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        lat_lng.to_world_point().multiply(2_f64.powf(z))
    }

    /// Unprojects world pixel coordinates back to LatLng at the given zoom level
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        LatLng::from_world_point(&pixel.multiply(1.0 / 2_f64.powf(z)))
    }

    /// Converts a geographical coordinate to a point relative to the container's top-left
    pub fn lat_lng_to_container_point(&self, lat_lng: &LatLng) -> Point {
        let offset = self
            .project(lat_lng, None)
            .subtract(&self.project(&self.center, None));
        Point::new(offset.x + self.size.x / 2.0, offset.y + self.size.y / 2.0)
    }

    /// Converts a container point back to geographical coordinates
    pub fn container_point_to_lat_lng(&self, point: &Point) -> LatLng {
        let offset = Point::new(point.x - self.size.x / 2.0, point.y - self.size.y / 2.0);
        let world = self.project(&self.center, None).add(&offset);
        self.unproject(&world, None)
    }

    /// Pans the viewport by the given pixel offset (drag semantics)
    pub fn pan(&mut self, delta: Point) {
        let center_px = self.project(&self.center, None);
        let new_center = self.unproject(&center_px.subtract(&delta), None);
        self.set_center(new_center);
    }

    /// Fits the viewport to contain the given bounds
    ///
    /// Picks the largest integer zoom (capped by `max_fit_zoom`) at which the
    /// bounds fit inside the container minus `padding` on every side.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64, max_fit_zoom: Option<f64>) {
        self.set_center(bounds.center());

        let available = Point::new(
            (self.size.x - 2.0 * padding).max(1.0),
            (self.size.y - 2.0 * padding).max(1.0),
        );
        let ceiling = max_fit_zoom.unwrap_or(self.max_zoom).min(self.max_zoom);

        let mut best_zoom = self.min_zoom;
        for test_zoom in (self.min_zoom.ceil() as i32)..=(ceiling.floor() as i32) {
            let zoom = test_zoom as f64;

            let nw = self.project(&bounds.north_west(), Some(zoom));
            let se = self.project(&bounds.south_east(), Some(zoom));

            let bounds_width = (se.x - nw.x).abs();
            let bounds_height = (se.y - nw.y).abs();

            if bounds_width <= available.x && bounds_height <= available.y {
                best_zoom = zoom;
            } else {
                break;
            }
        }

        log::debug!(
            "fit_bounds: center=({:.5}, {:.5}) zoom={}",
            self.center.lat,
            self.center.lng,
            best_zoom
        );
        self.set_zoom(best_zoom);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}
