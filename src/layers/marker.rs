use crate::core::geo::LatLng;
use crate::data::entity::GeoEntity;
use serde::{Deserialize, Serialize};

/// Provider-issued handle of a marker placed on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// What the provider needs to draw a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub position: LatLng,
    /// Hover label
    pub title: String,
}

impl MarkerOptions {
    pub fn for_entity(entity: &GeoEntity) -> Self {
        Self {
            position: entity.position(),
            title: entity.title.clone(),
        }
    }
}

/// A live marker together with the post it stands for
///
/// Not `Clone`: the reconciler is the only owner of a live handle.
#[derive(Debug)]
pub struct Marker {
    id: MarkerId,
    entity: GeoEntity,
}

impl Marker {
    pub(crate) fn new(id: MarkerId, entity: GeoEntity) -> Self {
        Self { id, entity }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn entity(&self) -> &GeoEntity {
        &self.entity
    }

    pub fn entity_id(&self) -> &str {
        &self.entity.id
    }

    pub fn position(&self) -> LatLng {
        self.entity.position()
    }

    pub fn title(&self) -> &str {
        &self.entity.title
    }

    /// Whether the marker still draws `entity` correctly (same place and label)
    pub(crate) fn draws(&self, entity: &GeoEntity) -> bool {
        self.entity.id == entity.id
            && self.entity.lat == entity.lat
            && self.entity.lng == entity.lng
            && self.entity.title == entity.title
    }

    pub(crate) fn refresh(&mut self, entity: GeoEntity) {
        self.entity = entity;
    }
}
