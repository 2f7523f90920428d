//! Keeps the set of markers on a map in step with the latest post list
//!
//! After every [`MarkerReconciler::reconcile`] call there is exactly one live
//! marker per (valid, distinct) post in the list and none for anything else.

use serde::{Deserialize, Serialize};

use crate::core::fit::ViewportController;
use crate::core::geo::LatLng;
use crate::data::entity::GeoEntity;
use crate::layers::marker::{Marker, MarkerId, MarkerOptions};
use crate::prelude::{HashMap, HashSet};
use crate::traits::MapBackend;

/// How markers are brought in line with a new list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Remove every marker and recreate one per post
    #[default]
    Rebuild,
    /// Keep markers whose post kept its id, position and title
    Diff,
}

/// What a reconcile pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub removed: usize,
    pub kept: usize,
    /// Posts left off the map (bad coordinates, duplicate id, provider refused)
    pub skipped: usize,
    /// Whether this pass performed the one-time viewport fit
    pub fitted: bool,
}

#[derive(Debug, Default)]
pub struct MarkerReconciler {
    mode: ReconcileMode,
    markers: Vec<Marker>,
    by_handle: HashMap<MarkerId, usize>,
}

impl MarkerReconciler {
    pub fn new(mode: ReconcileMode) -> Self {
        Self {
            mode,
            markers: Vec::new(),
            by_handle: HashMap::default(),
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Live markers, in the order of the last reconciled list
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// The post behind a clicked marker
    pub fn entity_for(&self, marker: MarkerId) -> Option<&GeoEntity> {
        self.by_handle
            .get(&marker)
            .and_then(|&idx| self.markers.get(idx))
            .map(Marker::entity)
    }

    pub fn contains_entity(&self, entity_id: &str) -> bool {
        self.markers.iter().any(|m| m.entity_id() == entity_id)
    }

    /// Brings the map's markers in line with `entities` and performs the
    /// one-time viewport fit if it has not happened yet.
    pub fn reconcile<B>(
        &mut self,
        backend: &mut B,
        viewport: &mut ViewportController,
        entities: &[GeoEntity],
    ) -> ReconcileOutcome
    where
        B: MapBackend + ?Sized,
    {
        let mut outcome = ReconcileOutcome::default();
        let accepted = accept_entities(entities, &mut outcome);

        match self.mode {
            ReconcileMode::Rebuild => self.rebuild(backend, &accepted, &mut outcome),
            ReconcileMode::Diff => self.diff(backend, &accepted, &mut outcome),
        }
        self.reindex();

        if !self.markers.is_empty() {
            let positions: Vec<LatLng> = self.markers.iter().map(Marker::position).collect();
            outcome.fitted = viewport.fit_to_bounds(backend, &positions);
        }

        log::debug!(
            "reconciled {} posts: {} created, {} removed, {} kept, {} skipped{}",
            entities.len(),
            outcome.created,
            outcome.removed,
            outcome.kept,
            outcome.skipped,
            if outcome.fitted { ", fitted viewport" } else { "" }
        );
        outcome
    }

    /// Detaches every marker from the map. Returns how many were removed.
    pub fn clear<B>(&mut self, backend: &mut B) -> usize
    where
        B: MapBackend + ?Sized,
    {
        let removed = self.markers.len();
        for marker in self.markers.drain(..) {
            backend.remove_marker(marker.id());
        }
        self.by_handle.clear();
        removed
    }

    fn rebuild<B>(&mut self, backend: &mut B, accepted: &[&GeoEntity], outcome: &mut ReconcileOutcome)
    where
        B: MapBackend + ?Sized,
    {
        outcome.removed += self.clear(backend);

        for entity in accepted {
            if let Some(marker) = place(backend, entity, outcome) {
                self.markers.push(marker);
            }
        }
    }

    fn diff<B>(&mut self, backend: &mut B, accepted: &[&GeoEntity], outcome: &mut ReconcileOutcome)
    where
        B: MapBackend + ?Sized,
    {
        let mut previous: HashMap<String, Marker> = self
            .markers
            .drain(..)
            .map(|m| (m.entity_id().to_string(), m))
            .collect();
        self.by_handle.clear();

        for entity in accepted {
            match previous.remove(&entity.id) {
                Some(mut marker) if marker.draws(entity) => {
                    marker.refresh((*entity).clone());
                    outcome.kept += 1;
                    self.markers.push(marker);
                }
                Some(stale) => {
                    backend.remove_marker(stale.id());
                    outcome.removed += 1;
                    if let Some(marker) = place(backend, entity, outcome) {
                        self.markers.push(marker);
                    }
                }
                None => {
                    if let Some(marker) = place(backend, entity, outcome) {
                        self.markers.push(marker);
                    }
                }
            }
        }

        for (_, gone) in previous {
            backend.remove_marker(gone.id());
            outcome.removed += 1;
        }
    }

    fn reindex(&mut self) {
        self.by_handle = self
            .markers
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id(), idx))
            .collect();
    }
}

/// Drops posts that cannot be placed or would break the one-marker-per-id rule
fn accept_entities<'a>(
    entities: &'a [GeoEntity],
    outcome: &mut ReconcileOutcome,
) -> Vec<&'a GeoEntity> {
    let mut seen: HashSet<&str> = HashSet::default();
    let mut accepted = Vec::with_capacity(entities.len());

    for entity in entities {
        if !entity.position().is_valid() {
            log::warn!(
                "post {} has invalid coordinates ({}, {}), not placing a marker",
                entity.id,
                entity.lat,
                entity.lng
            );
            outcome.skipped += 1;
            continue;
        }
        if !seen.insert(entity.id.as_str()) {
            log::warn!("duplicate post id {} in list, keeping the first", entity.id);
            outcome.skipped += 1;
            continue;
        }
        accepted.push(entity);
    }
    accepted
}

fn place<B>(backend: &mut B, entity: &GeoEntity, outcome: &mut ReconcileOutcome) -> Option<Marker>
where
    B: MapBackend + ?Sized,
{
    match backend.add_marker(MarkerOptions::for_entity(entity)) {
        Ok(id) => {
            outcome.created += 1;
            Some(Marker::new(id, entity.clone()))
        }
        Err(e) => {
            log::warn!("provider refused marker for post {}: {}", entity.id, e);
            outcome.skipped += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::headless::HeadlessMap;

    fn post(id: &str, lat: f64, lng: f64) -> GeoEntity {
        GeoEntity::new(id, format!("Post {id}"), "cafe", LatLng::new(lat, lng))
    }

    fn three_posts() -> Vec<GeoEntity> {
        vec![
            post("a", 38.24, 21.73),
            post("b", 38.25, 21.74),
            post("c", 38.26, 21.75),
        ]
    }

    #[test]
    fn test_one_marker_per_entity() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        let outcome = reconciler.reconcile(&mut map, &mut viewport, &three_posts());

        assert_eq!(outcome.created, 3);
        assert_eq!(reconciler.len(), 3);
        assert_eq!(map.marker_count(), 3);
        let ids: HashSet<&str> = reconciler.markers().iter().map(|m| m.entity_id()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("a") && ids.contains("b") && ids.contains("c"));
    }

    #[test]
    fn test_repeated_reconcile_is_stable() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();
        let posts = three_posts();

        reconciler.reconcile(&mut map, &mut viewport, &posts);
        let first: Vec<_> = map.markers().map(|(_, o)| o.position).collect();

        let outcome = reconciler.reconcile(&mut map, &mut viewport, &posts);
        let second: Vec<_> = map.markers().map(|(_, o)| o.position).collect();

        assert_eq!(outcome.removed, 3);
        assert_eq!(outcome.created, 3);
        assert_eq!(map.marker_count(), 3);
        assert_eq!(first.len(), second.len());
        for position in &first {
            assert!(second.contains(position));
        }
    }

    #[test]
    fn test_empty_list_clears_without_fit() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        reconciler.reconcile(&mut map, &mut viewport, &three_posts());
        assert_eq!(map.fit_count(), 1);

        let outcome = reconciler.reconcile(&mut map, &mut viewport, &[]);

        assert_eq!(outcome.removed, 3);
        assert!(!outcome.fitted);
        assert!(reconciler.is_empty());
        assert_eq!(map.marker_count(), 0);
        assert_eq!(map.fit_count(), 1);
        assert!(viewport.has_fitted());
    }

    #[test]
    fn test_empty_first_list_leaves_latch_armed() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        reconciler.reconcile(&mut map, &mut viewport, &[]);
        assert!(!viewport.has_fitted());
        assert_eq!(map.fit_count(), 0);
    }

    #[test]
    fn test_fit_fires_once_on_fifth_call() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        for _ in 0..4 {
            assert!(!reconciler.reconcile(&mut map, &mut viewport, &[]).fitted);
        }
        assert!(reconciler.reconcile(&mut map, &mut viewport, &three_posts()).fitted);
        for _ in 0..3 {
            assert!(!reconciler.reconcile(&mut map, &mut viewport, &three_posts()).fitted);
        }
        assert_eq!(map.fit_count(), 1);
    }

    #[test]
    fn test_click_lookup_follows_handles() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        reconciler.reconcile(&mut map, &mut viewport, &three_posts());
        let old_handle = reconciler.markers()[1].id();
        assert_eq!(reconciler.entity_for(old_handle).unwrap().id, "b");

        reconciler.reconcile(&mut map, &mut viewport, &three_posts());
        assert!(reconciler.entity_for(old_handle).is_none());
        let new_handle = reconciler.markers()[1].id();
        assert_eq!(reconciler.entity_for(new_handle).unwrap().id, "b");
    }

    #[test]
    fn test_invalid_and_duplicate_entities_skipped() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        let posts = vec![
            post("a", 38.24, 21.73),
            post("a", 38.30, 21.80),
            post("nan", f64::NAN, 21.0),
            post("far", 95.0, 21.0),
            post("b", 38.25, 21.74),
        ];
        let outcome = reconciler.reconcile(&mut map, &mut viewport, &posts);

        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(map.marker_count(), 2);
        assert_eq!(reconciler.markers()[0].position(), LatLng::new(38.24, 21.73));
    }

    #[test]
    fn test_diff_mode_only_touches_deltas() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::new(ReconcileMode::Diff);

        reconciler.reconcile(&mut map, &mut viewport, &three_posts());
        let handle_a = reconciler.markers()[0].id();

        let mut next = vec![post("a", 38.24, 21.73), post("b", 38.27, 21.74)];
        next[0].description = Some("now with a description".to_string());
        next.push(post("d", 38.28, 21.76));

        let outcome = reconciler.reconcile(&mut map, &mut viewport, &next);

        assert_eq!(outcome.kept, 1);
        // b moved, c left
        assert_eq!(outcome.removed, 2);
        // b re-placed, d new
        assert_eq!(outcome.created, 2);
        assert_eq!(map.marker_count(), 3);
        assert_eq!(reconciler.markers()[0].id(), handle_a);
        assert_eq!(
            reconciler.entity_for(handle_a).unwrap().description.as_deref(),
            Some("now with a description")
        );
        assert!(!reconciler.contains_entity("c"));
    }

    #[test]
    fn test_clear_detaches_everything() {
        let mut map = HeadlessMap::default();
        let mut viewport = ViewportController::default();
        let mut reconciler = MarkerReconciler::default();

        reconciler.reconcile(&mut map, &mut viewport, &three_posts());
        assert_eq!(reconciler.clear(&mut map), 3);
        assert_eq!(map.marker_count(), 0);
        assert!(reconciler.is_empty());
    }
}
