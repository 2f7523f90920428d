//! Single-pin location picker used when creating or editing a post
//!
//! The pin starts at the requested center (or the current value, or the
//! configured default). A click on the map moves the pin there and pans to
//! it. An external value, such as a geocoded address, does the same.

use crate::core::config::ViewportConfig;
use crate::core::geo::LatLng;
use crate::input::events::{EventQueue, MapEvent};
use crate::layers::marker::{MarkerId, MarkerOptions};
use crate::traits::{Geocoder, MapBackend};
use crate::{MapError, Result};

pub struct LocationPicker<B: MapBackend> {
    backend: Option<B>,
    marker: Option<MarkerId>,
    value: Option<LatLng>,
    initial: LatLng,
}

impl<B: MapBackend> LocationPicker<B> {
    pub fn new(center: Option<LatLng>, value: Option<LatLng>, config: &ViewportConfig) -> Self {
        Self {
            backend: None,
            marker: None,
            value,
            initial: center.or(value).unwrap_or(config.default_center),
        }
    }

    /// Binds a map instance and places the pin on it.
    ///
    /// The instance stays attached even if the provider refuses the pin; the
    /// next pick places it again.
    pub fn attach(&mut self, backend: B) -> Result<()> {
        if self.backend.is_some() {
            drop(self.detach());
        }
        self.backend = Some(backend);
        self.place(self.value.unwrap_or(self.initial))
    }

    /// Removes the pin and hands the instance back. The value is kept.
    pub fn detach(&mut self) -> Option<B> {
        let mut backend = self.backend.take()?;
        if let Some(marker) = self.marker.take() {
            backend.remove_marker(marker);
        }
        Some(backend)
    }

    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    /// Last picked or assigned position
    pub fn value(&self) -> Option<LatLng> {
        self.value
    }

    /// Handle of the pin, while one is on the map
    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }

    fn place(&mut self, position: LatLng) -> Result<()> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| MapError::NotFound("no map attached".to_string()))?;

        match self.marker {
            Some(marker) => backend.move_marker(marker, position)?,
            None => {
                let marker = backend.add_marker(MarkerOptions {
                    position,
                    title: String::new(),
                })?;
                self.marker = Some(marker);
            }
        }
        backend.pan_to(position);
        Ok(())
    }

    /// Moves the pin to `value` and recenters the map.
    ///
    /// Without an attached map the value is stored and shown on the next
    /// [`LocationPicker::attach`].
    pub fn set_value(&mut self, value: LatLng) -> Result<()> {
        if !value.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "({}, {})",
                value.lat, value.lng
            )));
        }
        if self.backend.is_some() {
            self.place(value)?;
        }
        self.value = Some(value);
        Ok(())
    }

    /// Applies a click on the map and returns the picked position
    pub fn pick(&mut self, lat_lng: LatLng) -> Result<LatLng> {
        if self.backend.is_none() {
            return Err(MapError::NotFound("no map attached".to_string()));
        }
        self.set_value(lat_lng)?;
        log::debug!("picked ({:.6}, {:.6})", lat_lng.lat, lat_lng.lng);
        Ok(lat_lng)
    }

    /// Returns the newly picked position for a map click, `None` otherwise
    pub fn handle_event(&mut self, event: MapEvent) -> Option<LatLng> {
        match event {
            MapEvent::MapClicked { lat_lng } => match self.pick(lat_lng) {
                Ok(picked) => Some(picked),
                Err(e) => {
                    log::warn!("ignoring map click: {}", e);
                    None
                }
            },
            MapEvent::MapLost => {
                drop(self.detach());
                None
            }
            _ => None,
        }
    }

    /// Handles every queued event and returns the last picked position
    pub fn pump_events(&mut self, queue: &EventQueue) -> Option<LatLng> {
        queue
            .drain()
            .into_iter()
            .filter_map(|event| self.handle_event(event))
            .last()
    }

    /// Display address of the current value
    pub async fn describe(&self, geocoder: &dyn Geocoder) -> Result<Option<String>> {
        match self.value {
            Some(value) => geocoder.reverse(&value).await,
            None => Ok(None),
        }
    }
}
