//! In-process map backend
//!
//! Behaves like a provider map instance without drawing anything: it keeps
//! a [`Viewport`], hands out marker handles, answers projection queries and
//! emits the same events a browser binding would. Used by tests, the demo
//! binary and server-side previews.

use std::collections::BTreeMap;

use crate::core::bounds::Bounds;
use crate::core::config::ViewportConfig;
use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::core::viewport::Viewport;
use crate::input::events::{EventSender, MapEvent};
use crate::layers::marker::{MarkerId, MarkerOptions};
use crate::traits::{FitOptions, MapBackend, MapProjection};
use crate::{MapError, Result};

#[derive(Debug)]
pub struct HeadlessMap {
    viewport: Viewport,
    /// Page-space top-left of the container
    origin: Point,
    markers: BTreeMap<MarkerId, MarkerOptions>,
    next_id: u64,
    projection_ready: bool,
    fit_count: usize,
    events: Option<EventSender>,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: f64, container: Bounds) -> Self {
        Self {
            viewport: Viewport::new(center, zoom, container.size()),
            origin: container.min,
            markers: BTreeMap::new(),
            next_id: 1,
            projection_ready: true,
            fit_count: 0,
            events: None,
        }
    }

    pub fn from_config(config: &ViewportConfig, container: Bounds) -> Self {
        Self::new(config.default_center, config.default_zoom, container)
    }

    /// Routes provider events (clicks, view changes, loss) to `sender`
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Simulates tiles not being loaded yet
    pub fn set_projection_ready(&mut self, ready: bool) {
        self.projection_ready = ready;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&MarkerOptions> {
        self.markers.get(&id)
    }

    /// Live markers in handle order
    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &MarkerOptions)> {
        self.markers.iter().map(|(id, options)| (*id, options))
    }

    /// Number of programmatic fits performed on this instance
    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    fn emit(&self, event: MapEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                log::debug!("map event dropped, receiver gone");
            }
        }
    }

    fn emit_view_changed(&self) {
        self.emit(MapEvent::ViewChanged {
            center: self.viewport.center,
            zoom: self.viewport.zoom,
        });
    }

    /// User drag by a pixel delta
    pub fn user_pan(&mut self, delta: Point) {
        self.viewport.pan(delta);
        self.emit_view_changed();
    }

    /// User zoom (wheel, pinch, buttons)
    pub fn user_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
        self.emit_view_changed();
    }

    /// User click on a marker glyph. Returns `false` for unknown handles.
    pub fn click_marker(&self, id: MarkerId) -> bool {
        if !self.markers.contains_key(&id) {
            return false;
        }
        self.emit(MapEvent::MarkerClicked { marker: id });
        true
    }

    /// User click on the map surface at a container-relative point
    pub fn click_map(&self, point: Point) -> LatLng {
        let lat_lng = self.viewport.container_point_to_lat_lng(&point);
        self.emit(MapEvent::MapClicked { lat_lng });
        lat_lng
    }

    /// Container moved or resized on the page
    pub fn move_container(&mut self, rect: Bounds) {
        self.origin = rect.min;
        self.viewport.set_size(rect.size());
        self.emit(MapEvent::ContainerMoved { rect });
    }

    /// Destroys the instance: markers go away and projection stops working
    pub fn destroy(&mut self) {
        self.markers.clear();
        self.projection_ready = false;
        self.emit(MapEvent::MapLost);
    }
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::from_config(
            &ViewportConfig::default(),
            Bounds::from_rect(0.0, 0.0, 800.0, 600.0),
        )
    }
}

impl MapBackend for HeadlessMap {
    fn add_marker(&mut self, options: MarkerOptions) -> Result<MarkerId> {
        if !options.position.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "({}, {})",
                options.position.lat, options.position.lng
            )));
        }
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.markers.insert(id, options);
        Ok(id)
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
    }

    fn move_marker(&mut self, marker: MarkerId, position: LatLng) -> Result<()> {
        if !position.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "({}, {})",
                position.lat, position.lng
            )));
        }
        let options = self
            .markers
            .get_mut(&marker)
            .ok_or_else(|| MapError::NotFound(marker.to_string()))?;
        options.position = position;
        Ok(())
    }

    fn pan_to(&mut self, center: LatLng) {
        self.viewport.set_center(center);
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, options: FitOptions) {
        self.viewport
            .fit_bounds(bounds, options.padding, options.max_zoom);
        self.fit_count += 1;
    }

    fn projection(&self) -> Option<&dyn MapProjection> {
        if self.projection_ready {
            Some(self)
        } else {
            None
        }
    }

    fn container_rect(&self) -> Bounds {
        Bounds::from_rect(
            self.origin.x,
            self.origin.y,
            self.viewport.size.x,
            self.viewport.size.y,
        )
    }
}

impl MapProjection for HeadlessMap {
    fn project_to_world(&self, lat_lng: &LatLng) -> Result<Point> {
        if !lat_lng.lat.is_finite() || !lat_lng.lng.is_finite() {
            return Err(MapError::Projection(format!(
                "cannot project ({}, {})",
                lat_lng.lat, lat_lng.lng
            )));
        }
        Ok(lat_lng.to_world_point())
    }

    fn current_center(&self) -> LatLng {
        self.viewport.center
    }

    fn current_zoom(&self) -> f64 {
        self.viewport.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::events::EventQueue;

    #[test]
    fn test_marker_handles_are_unique() {
        let mut map = HeadlessMap::default();
        let options = MarkerOptions {
            position: LatLng::new(38.24, 21.73),
            title: "a".to_string(),
        };

        let first = map.add_marker(options.clone()).unwrap();
        map.remove_marker(first);
        let second = map.add_marker(options).unwrap();

        assert_ne!(first, second);
        assert_eq!(map.marker_count(), 1);
    }

    #[test]
    fn test_rejects_invalid_marker() {
        let mut map = HeadlessMap::default();
        let result = map.add_marker(MarkerOptions {
            position: LatLng::new(f64::NAN, 0.0),
            title: "bad".to_string(),
        });
        assert!(matches!(result, Err(MapError::InvalidCoordinates(_))));
    }

    #[test]
    fn test_projection_agrees_with_viewport() {
        let map = HeadlessMap::new(
            LatLng::new(38.246242, 21.735084),
            13.0,
            Bounds::from_rect(0.0, 0.0, 800.0, 600.0),
        );
        let projection = map.projection().unwrap();
        let target = LatLng::new(38.25, 21.74);

        let world = projection.project_to_world(&target).unwrap();
        let center = projection.project_to_world(&projection.current_center()).unwrap();
        let scale = 2_f64.powf(projection.current_zoom());
        let via_projection = Point::new(
            400.0 + (world.x - center.x) * scale,
            300.0 + (world.y - center.y) * scale,
        );
        let via_viewport = map.viewport().lat_lng_to_container_point(&target);

        assert!((via_projection.x - via_viewport.x).abs() < 1e-6);
        assert!((via_projection.y - via_viewport.y).abs() < 1e-6);
    }

    #[test]
    fn test_map_click_resolves_coordinate() {
        let queue = EventQueue::new();
        let map = HeadlessMap::new(
            LatLng::new(38.246242, 21.735084),
            13.0,
            Bounds::from_rect(0.0, 0.0, 800.0, 600.0),
        )
        .with_events(queue.sender());

        let middle = map.click_map(Point::new(400.0, 300.0));
        assert!((middle.lat - 38.246242).abs() < 1e-9);
        assert!((middle.lng - 21.735084).abs() < 1e-9);

        // Right of center is east, below center is south
        let offset = map.click_map(Point::new(500.0, 400.0));
        assert!(offset.lng > middle.lng);
        assert!(offset.lat < middle.lat);

        assert_eq!(
            queue.drain(),
            vec![
                MapEvent::MapClicked { lat_lng: middle },
                MapEvent::MapClicked { lat_lng: offset },
            ]
        );
    }

    #[test]
    fn test_move_marker_and_pan() {
        let mut map = HeadlessMap::default();
        let id = map
            .add_marker(MarkerOptions {
                position: LatLng::new(38.24, 21.73),
                title: String::new(),
            })
            .unwrap();

        let target = LatLng::new(38.26, 21.75);
        map.move_marker(id, target).unwrap();
        map.pan_to(target);
        assert_eq!(map.marker(id).unwrap().position, target);
        assert_eq!(map.viewport().center, target);

        assert!(matches!(
            map.move_marker(MarkerId(99), target),
            Err(MapError::NotFound(_))
        ));
        assert!(matches!(
            map.move_marker(id, LatLng::new(f64::NAN, 0.0)),
            Err(MapError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_user_interaction_emits_events() {
        let queue = EventQueue::new();
        let mut map = HeadlessMap::default().with_events(queue.sender());

        map.user_zoom(15.0);
        let unknown = MarkerId(99);
        assert!(!map.click_marker(unknown));
        map.destroy();

        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MapEvent::ViewChanged { zoom, .. } if zoom == 15.0));
        assert_eq!(events[1], MapEvent::MapLost);
        assert!(map.projection().is_none());
    }
}
