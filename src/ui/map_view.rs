//! The listing map: markers, first fit and the details popup around one
//! provider map instance
//!
//! Everything here runs on the task that owns the view. Provider callbacks
//! reach it only as [`MapEvent`]s, either through [`MapView::handle_event`]
//! directly or queued on an [`EventQueue`] and drained by
//! [`MapView::pump_events`].

use crate::core::config::PostmapConfig;
use crate::core::fit::ViewportController;
use crate::core::geo::Point;
use crate::core::projector::ScreenProjector;
use crate::data::entity::{CategoryFilter, GeoEntity};
use crate::input::events::{DismissReason, EventHandled, EventQueue, KeyCode, MapEvent};
use crate::layers::marker::MarkerId;
use crate::layers::reconciler::{MarkerReconciler, ReconcileOutcome};
use crate::sync::snapshot::Snapshot;
use crate::traits::MapBackend;
use crate::ui::popup::PopupOverlay;

pub struct MapView<B: MapBackend> {
    backend: Option<B>,
    reconciler: MarkerReconciler,
    controller: ViewportController,
    projector: ScreenProjector,
    popup: PopupOverlay,
    filter: CategoryFilter,
    /// Last full list, before the category filter
    entities: Vec<GeoEntity>,
    applied_seq: Option<u64>,
}

impl<B: MapBackend> MapView<B> {
    pub fn new(config: &PostmapConfig) -> Self {
        Self {
            backend: None,
            reconciler: MarkerReconciler::new(config.viewport.reconcile_mode),
            controller: ViewportController::from_config(&config.viewport),
            projector: ScreenProjector::from_config(&config.overlay),
            popup: PopupOverlay::new(),
            filter: CategoryFilter::all(),
            entities: Vec::new(),
            applied_seq: None,
        }
    }

    /// Binds a freshly created map instance and draws the current list on it.
    ///
    /// A previously attached instance is detached and dropped first. The
    /// one-time fit is re-armed since the new instance has never been fitted.
    pub fn attach(&mut self, backend: B) -> ReconcileOutcome {
        if self.backend.is_some() {
            log::debug!("replacing attached map instance");
            drop(self.detach());
        }
        self.controller.reset();
        self.backend = Some(backend);
        self.refresh().unwrap_or_default()
    }

    /// Removes markers and the popup from the map and hands the instance back
    pub fn detach(&mut self) -> Option<B> {
        let mut backend = self.backend.take()?;
        self.popup.close(DismissReason::MapLost);
        let removed = self.reconciler.clear(&mut backend);
        log::debug!("detached map, removed {} markers", removed);
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

    /// Replaces the post list. Markers are updated if a map is attached;
    /// otherwise the list waits for [`MapView::attach`].
    pub fn set_entities(&mut self, entities: Vec<GeoEntity>) -> Option<ReconcileOutcome> {
        self.entities = entities;
        self.refresh()
    }

    /// Applies a published snapshot unless it (or a newer one) was applied
    /// already.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Option<ReconcileOutcome> {
        if snapshot.is_initial() {
            return None;
        }
        if self.applied_seq.is_some_and(|seq| seq >= snapshot.seq) {
            log::debug!("snapshot #{} already applied", snapshot.seq);
            return None;
        }
        self.applied_seq = Some(snapshot.seq);
        self.set_entities(snapshot.entities.as_ref().clone())
    }

    pub fn set_category_filter(&mut self, filter: CategoryFilter) -> Option<ReconcileOutcome> {
        if self.filter == filter {
            return None;
        }
        self.filter = filter;
        self.refresh()
    }

    pub fn category_filter(&self) -> &CategoryFilter {
        &self.filter
    }

    /// Full list as last supplied
    pub fn entities(&self) -> &[GeoEntity] {
        &self.entities
    }

    /// Posts passing the current category filter
    pub fn visible_entities(&self) -> Vec<GeoEntity> {
        self.filter.apply(&self.entities)
    }

    pub fn applied_seq(&self) -> Option<u64> {
        self.applied_seq
    }

    pub fn reconciler(&self) -> &MarkerReconciler {
        &self.reconciler
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn popup(&self) -> &PopupOverlay {
        &self.popup
    }

    fn refresh(&mut self) -> Option<ReconcileOutcome> {
        let backend = self.backend.as_mut()?;
        let visible = self.filter.apply(&self.entities);
        let outcome = self
            .reconciler
            .reconcile(backend, &mut self.controller, &visible);

        let selected_gone = self
            .popup
            .entity()
            .is_some_and(|e| !self.reconciler.contains_entity(&e.id));
        if selected_gone {
            self.popup.close(DismissReason::EntityRemoved);
        }
        Some(outcome)
    }

    /// Page-space anchor for `entity` from the live map state
    fn anchor_for(&self, entity: &GeoEntity) -> Option<Point> {
        let backend = self.backend.as_ref()?;
        self.projector.project(
            &entity.position(),
            backend.projection(),
            &backend.container_rect(),
        )
    }

    fn open_popup(&mut self, entity: GeoEntity) -> bool {
        match self.anchor_for(&entity) {
            Some(anchor) => {
                self.popup.open(entity, anchor);
                true
            }
            None => {
                log::warn!("could not position popup for post {}", entity.id);
                self.popup.close(DismissReason::Replaced);
                false
            }
        }
    }

    /// Opens the popup for the post behind a marker handle
    pub fn select_marker(&mut self, marker: MarkerId) -> bool {
        let Some(entity) = self.reconciler.entity_for(marker).cloned() else {
            log::debug!("click on unknown marker {}", marker);
            return false;
        };
        self.open_popup(entity)
    }

    /// Opens the popup for a post currently on the map
    pub fn select_entity(&mut self, entity_id: &str) -> bool {
        let entity = self
            .reconciler
            .markers()
            .iter()
            .find(|m| m.entity_id() == entity_id)
            .map(|m| m.entity().clone());
        match entity {
            Some(entity) => self.open_popup(entity),
            None => false,
        }
    }

    fn reposition_popup(&mut self) {
        let Some(entity) = self.popup.entity() else {
            return;
        };
        if let Some(anchor) = self.anchor_for(entity) {
            self.popup.reposition(anchor);
        }
    }

    pub fn handle_event(&mut self, event: MapEvent) -> EventHandled {
        let handled = match event {
            MapEvent::MarkerClicked { marker } => self.select_marker(marker),
            MapEvent::KeyPressed { key: KeyCode::Escape } => {
                return self.popup.handle_key(KeyCode::Escape);
            }
            MapEvent::KeyPressed { .. } => false,
            MapEvent::MapClicked { .. } => false,
            MapEvent::BackdropClicked => self.popup.close(DismissReason::Backdrop),
            MapEvent::CloseRequested => self.popup.close(DismissReason::CloseButton),
            MapEvent::ViewChanged { .. } | MapEvent::ContainerMoved { .. } => {
                self.reposition_popup();
                self.popup.is_open()
            }
            MapEvent::MapLost => {
                log::info!("map instance lost");
                drop(self.detach());
                true
            }
        };

        if handled {
            EventHandled::Handled
        } else {
            EventHandled::NotHandled
        }
    }

    /// Handles every queued event. Returns how many were handled.
    pub fn pump_events(&mut self, queue: &EventQueue) -> usize {
        queue
            .drain()
            .into_iter()
            .filter(|event| self.handle_event(event.clone()) == EventHandled::Handled)
            .count()
    }
}

impl<B: MapBackend> Default for MapView<B> {
    fn default() -> Self {
        Self::new(&PostmapConfig::default())
    }
}
