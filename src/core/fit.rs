//! One-shot "fit to data" for a map instance
//!
//! The first non-empty population moves the viewport so every marker is
//! visible. After that the viewport belongs to the user.

use crate::core::config::ViewportConfig;
use crate::core::geo::{LatLng, LatLngBounds};
use crate::traits::{FitOptions, MapBackend};

#[derive(Debug, Clone)]
pub struct ViewportController {
    initial_fit_done: bool,
    options: FitOptions,
}

impl ViewportController {
    pub fn new(options: FitOptions) -> Self {
        Self {
            initial_fit_done: false,
            options,
        }
    }

    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new(FitOptions {
            padding: config.fit_padding,
            max_zoom: config.max_fit_zoom,
        })
    }

    /// Whether the latch has fired for the current map instance
    pub fn has_fitted(&self) -> bool {
        self.initial_fit_done
    }

    /// Fits the map to `positions` unless a fit already happened.
    ///
    /// Returns `true` only for the call that actually moved the viewport.
    /// An empty slice never trips the latch.
    pub fn fit_to_bounds<B>(&mut self, backend: &mut B, positions: &[LatLng]) -> bool
    where
        B: MapBackend + ?Sized,
    {
        if self.initial_fit_done {
            return false;
        }
        let Some(bounds) = LatLngBounds::from_points(positions) else {
            return false;
        };

        log::debug!(
            "initial fit to {} positions ({:.5},{:.5})..({:.5},{:.5})",
            positions.len(),
            bounds.south_west.lat,
            bounds.south_west.lng,
            bounds.north_east.lat,
            bounds.north_east.lng
        );
        backend.fit_bounds(&bounds, self.options);
        self.initial_fit_done = true;
        true
    }

    /// Re-arms the latch for a freshly attached map instance
    pub fn reset(&mut self) {
        self.initial_fit_done = false;
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::from_config(&ViewportConfig::default())
    }
}
