use serde::{Deserialize, Serialize};

use crate::core::bounds::Bounds;
use crate::core::geo::Point;
use crate::data::entity::GeoEntity;
use crate::input::events::{DismissReason, EventHandled, KeyCode};

/// What the popup shows for a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    /// Absent when the post has no description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category slug, uppercased for display
    pub category_label: String,
    pub category_emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl PopupContent {
    pub fn from_entity(entity: &GeoEntity) -> Self {
        Self {
            title: entity.title.clone(),
            description: entity
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            category_label: entity.category_slug.to_uppercase(),
            category_emoji: entity.category().emoji().to_string(),
            display_name: entity.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PopupState {
    Closed,
    Open { entity: GeoEntity, position: Point },
}

/// The single details popup anchored above a selected marker.
///
/// Opening for a different post replaces the current one, so there is never
/// more than one popup on the page.
#[derive(Debug, Clone)]
pub struct PopupOverlay {
    state: PopupState,
    last_dismissal: Option<DismissReason>,
}

impl PopupOverlay {
    pub fn new() -> Self {
        Self {
            state: PopupState::Closed,
            last_dismissal: None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PopupState::Open { .. })
    }

    pub fn entity(&self) -> Option<&GeoEntity> {
        match &self.state {
            PopupState::Open { entity, .. } => Some(entity),
            PopupState::Closed => None,
        }
    }

    /// Page-space anchor: the tip of the popup's pointer
    pub fn position(&self) -> Option<Point> {
        match &self.state {
            PopupState::Open { position, .. } => Some(*position),
            PopupState::Closed => None,
        }
    }

    pub fn last_dismissal(&self) -> Option<DismissReason> {
        self.last_dismissal
    }

    /// Shows `entity` at `position`. Returns `true` if another post's popup
    /// was replaced.
    pub fn open(&mut self, entity: GeoEntity, position: Point) -> bool {
        let replaced = match &self.state {
            PopupState::Open { entity: current, .. } if current.id != entity.id => {
                log::debug!("popup for {} replaced by {}", current.id, entity.id);
                self.last_dismissal = Some(DismissReason::Replaced);
                true
            }
            _ => false,
        };
        self.state = PopupState::Open { entity, position };
        replaced
    }

    /// Moves the anchor of an open popup; ignored when closed
    pub fn reposition(&mut self, anchor: Point) {
        if let PopupState::Open { position, .. } = &mut self.state {
            *position = anchor;
        }
    }

    /// Closes the popup. Returns `false` if it was already closed.
    pub fn close(&mut self, reason: DismissReason) -> bool {
        if !self.is_open() {
            return false;
        }
        log::debug!("popup closed: {:?}", reason);
        self.state = PopupState::Closed;
        self.last_dismissal = Some(reason);
        true
    }

    pub fn handle_key(&mut self, key: KeyCode) -> EventHandled {
        if key == KeyCode::Escape && self.close(DismissReason::Escape) {
            EventHandled::Handled
        } else {
            EventHandled::NotHandled
        }
    }

    pub fn content(&self) -> Option<PopupContent> {
        self.entity().map(PopupContent::from_entity)
    }

    /// Box of the given size, centred horizontally above the anchor
    pub fn anchor_rect(&self, size: Point) -> Option<Bounds> {
        let anchor = self.position()?;
        Some(Bounds::from_rect(
            anchor.x - size.x / 2.0,
            anchor.y - size.y,
            size.x,
            size.y,
        ))
    }
}

impl Default for PopupOverlay {
    fn default() -> Self {
        Self::new()
    }
}
