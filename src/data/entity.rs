//! Posts and the small value types around them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::constants::FALLBACK_CATEGORY;
use crate::core::geo::LatLng;
use crate::{MapError, Result};

/// A user-submitted, geotagged recommendation
///
/// Two entities are the same post iff their `id`s match; every other field
/// may change between polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntity {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_slug: String,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl GeoEntity {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category_slug: impl Into<String>,
        position: LatLng,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            category_slug: category_slug.into(),
            lat: position.lat,
            lng: position.lng,
            created_at: Utc::now(),
            owner_id: None,
            display_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn category(&self) -> Category {
        Category::from_slug(&self.category_slug)
    }
}

/// Result of the secondary owner lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerProfile {
    #[serde(alias = "user_id")]
    pub id: String,
    pub display_name: String,
}

/// The fixed category catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cafe,
    Restaurant,
    Museum,
    View,
    Bar,
    Club,
    Park,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Cafe,
        Category::Restaurant,
        Category::Museum,
        Category::View,
        Category::Bar,
        Category::Club,
        Category::Park,
        Category::Other,
    ];

    /// Unknown slugs fall back to [`Category::Other`]
    pub fn from_slug(slug: &str) -> Self {
        match slug.trim().to_ascii_lowercase().as_str() {
            "cafe" => Category::Cafe,
            "restaurant" => Category::Restaurant,
            "museum" => Category::Museum,
            "view" => Category::View,
            "bar" => Category::Bar,
            "club" => Category::Club,
            "park" => Category::Park,
            _ => Category::Other,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Category::Cafe => "cafe",
            Category::Restaurant => "restaurant",
            Category::Museum => "museum",
            Category::View => "view",
            Category::Bar => "bar",
            Category::Club => "club",
            Category::Park => "park",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Cafe => "Café",
            Category::Restaurant => "Restaurant",
            Category::Museum => "Museum",
            Category::View => "Viewpoint",
            Category::Bar => "Bar",
            Category::Club => "Nightclub",
            Category::Park => "Park",
            Category::Other => "Other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Cafe => "☕",
            Category::Restaurant => "🍽️",
            Category::Museum => "🏛️",
            Category::View => "🌅",
            Category::Bar => "🍹",
            Category::Club => "🎉",
            Category::Park => "🌳",
            Category::Other => "⭐",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Category selection applied between the synchronizer and the reconciler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter(Option<String>);

impl CategoryFilter {
    /// Keeps every post
    pub fn all() -> Self {
        Self(None)
    }

    pub fn only(slug: impl Into<String>) -> Self {
        Self(Some(slug.into()))
    }

    pub fn slug(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn matches(&self, entity: &GeoEntity) -> bool {
        match &self.0 {
            Some(slug) => entity.category_slug == *slug,
            None => true,
        }
    }

    pub fn apply(&self, entities: &[GeoEntity]) -> Vec<GeoEntity> {
        entities
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }
}

/// Payload for creating or updating a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub address: Option<String>,
    pub position: Option<LatLng>,
    pub category_slug: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<String>,
}

/// A draft that passed validation, with blank fields normalised away
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidPost {
    pub title: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub category_slug: String,
    pub description: Option<String>,
    #[serde(rename = "user_id", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PostDraft {
    pub fn new(title: impl Into<String>, position: LatLng) -> Self {
        Self {
            title: title.into(),
            address: None,
            position: Some(position),
            category_slug: None,
            description: None,
            owner_id: None,
        }
    }

    pub fn validate(&self) -> Result<ValidPost> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(MapError::Validation("title is required".to_string()));
        }
        let position = self.position.ok_or_else(|| {
            MapError::Validation("a location is required (address, coordinates or map)".to_string())
        })?;
        if !position.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "({}, {})",
                position.lat, position.lng
            )));
        }

        Ok(ValidPost {
            title: title.to_string(),
            address: non_blank(&self.address),
            lat: position.lat,
            lng: position.lng,
            category_slug: non_blank(&self.category_slug)
                .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
            description: non_blank(&self.description),
            owner_id: self.owner_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, category: &str) -> GeoEntity {
        GeoEntity::new(id, format!("Post {id}"), category, LatLng::new(38.24, 21.73))
    }

    #[test]
    fn test_category_round_trip_and_fallback() {
        for category in Category::ALL {
            assert_eq!(Category::from_slug(category.slug()), category);
        }
        assert_eq!(Category::from_slug("Cafe "), Category::Cafe);
        assert_eq!(Category::from_slug("bakery"), Category::Other);
        assert_eq!(Category::View.label(), "Viewpoint");
    }

    #[test]
    fn test_category_filter() {
        let posts = vec![post("a", "cafe"), post("b", "bar"), post("c", "cafe")];

        assert_eq!(CategoryFilter::all().apply(&posts).len(), 3);

        let cafes = CategoryFilter::only("cafe").apply(&posts);
        let ids: Vec<_> = cafes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert!(CategoryFilter::only("museum").apply(&posts).is_empty());
    }

    #[test]
    fn test_entity_deserializes_store_row() {
        let row = serde_json::json!({
            "id": "p1",
            "title": "Harbour café",
            "description": null,
            "category_slug": "cafe",
            "lat": 38.246,
            "lng": 21.735,
            "created_at": "2024-05-01T10:00:00Z",
            "user_id": "u1"
        });

        let entity: GeoEntity = serde_json::from_value(row).unwrap();
        assert_eq!(entity.owner_id.as_deref(), Some("u1"));
        assert!(entity.description.is_none());
        assert!(entity.display_name.is_none());
        assert_eq!(entity.category(), Category::Cafe);
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = PostDraft::new("  Castle view ", LatLng::new(38.25, 21.74));
        draft.description = Some("   ".to_string());
        draft.address = Some(" Patras Castle ".to_string());

        let valid = draft.validate().unwrap();
        assert_eq!(valid.title, "Castle view");
        assert_eq!(valid.address.as_deref(), Some("Patras Castle"));
        assert!(valid.description.is_none());
        assert_eq!(valid.category_slug, "other");
    }

    #[test]
    fn test_draft_rejects_missing_fields() {
        let blank = PostDraft::new("   ", LatLng::new(0.0, 0.0));
        assert!(matches!(blank.validate(), Err(MapError::Validation(_))));

        let mut nowhere = PostDraft::new("Somewhere", LatLng::new(0.0, 0.0));
        nowhere.position = None;
        assert!(matches!(nowhere.validate(), Err(MapError::Validation(_))));

        let off_world = PostDraft::new("Somewhere", LatLng::new(120.0, 0.0));
        assert!(matches!(
            off_world.validate(),
            Err(MapError::InvalidCoordinates(_))
        ));
    }
}
