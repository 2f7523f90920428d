//! Geographic to page-space projection for overlay anchoring
//!
//! Map providers do not hand out marker pixel positions, so the popup
//! anchor is recomputed from the live projection, center and zoom on every
//! selection.

use crate::core::bounds::Bounds;
use crate::core::config::OverlayConfig;
use crate::core::geo::{LatLng, Point};
use crate::traits::MapProjection;

/// Page-space position of a world point.
///
/// `container` is the map container's page rectangle; the result is
/// container top-left + half its size + the scaled world offset from the
/// center, shifted vertically by `vertical_offset`.
pub fn screen_position(
    world: Point,
    world_center: Point,
    zoom: f64,
    container: &Bounds,
    vertical_offset: f64,
) -> Point {
    let scale = 2_f64.powf(zoom);
    let offset = world.subtract(&world_center).multiply(scale);
    Point::new(
        container.min.x + container.width() / 2.0 + offset.x,
        container.min.y + container.height() / 2.0 + offset.y + vertical_offset,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProjector {
    vertical_offset: f64,
}

impl ScreenProjector {
    pub fn new(vertical_offset: f64) -> Self {
        Self { vertical_offset }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.vertical_offset)
    }

    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    /// Page-space anchor for `lat_lng`, or `None` when the map cannot project yet.
    pub fn project(
        &self,
        lat_lng: &LatLng,
        projection: Option<&dyn MapProjection>,
        container: &Bounds,
    ) -> Option<Point> {
        let Some(projection) = projection else {
            log::debug!("projection not ready, cannot anchor overlay");
            return None;
        };

        let center = projection.current_center();
        let zoom = projection.current_zoom();
        let world = projection.project_to_world(lat_lng);
        let world_center = projection.project_to_world(&center);

        let (world, world_center) = match (world, world_center) {
            (Ok(w), Ok(c)) => (w, c),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("error calculating popup position: {}", e);
                return None;
            }
        };

        if !zoom.is_finite() {
            log::warn!("error calculating popup position: zoom is {}", zoom);
            return None;
        }

        let position = screen_position(world, world_center, zoom, container, self.vertical_offset);
        if position.is_finite() {
            Some(position)
        } else {
            log::warn!("error calculating popup position: non-finite result");
            None
        }
    }
}

impl Default for ScreenProjector {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}
