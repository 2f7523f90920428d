use crate::core::bounds::Bounds;
use crate::core::geo::LatLng;
use crate::layers::marker::MarkerId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Keyboard key codes the overlay reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Escape,
    Enter,
    Tab,
    Other(u32),
}

impl KeyCode {
    /// Maps a DOM `KeyboardEvent.key` value
    pub fn from_key_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => KeyCode::Escape,
            "Enter" => KeyCode::Enter,
            "Tab" => KeyCode::Tab,
            other => KeyCode::Other(other.chars().next().map(u32::from).unwrap_or(0)),
        }
    }
}

/// Whether an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

/// Why an open popup went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissReason {
    CloseButton,
    Backdrop,
    Escape,
    /// Another marker was selected
    Replaced,
    /// The map instance went away
    MapLost,
    /// The selected post is no longer on the map
    EntityRemoved,
}

/// Events delivered from the map provider and the page to the map view
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A marker glyph was clicked
    MarkerClicked { marker: MarkerId },
    /// Click on the map surface, already resolved to a coordinate
    MapClicked { lat_lng: LatLng },
    /// Key pressed anywhere on the page
    KeyPressed { key: KeyCode },
    /// Click on the full-page backdrop behind an open popup
    BackdropClicked,
    /// The popup's close button
    CloseRequested,
    /// User pan or zoom finished
    ViewChanged { center: LatLng, zoom: f64 },
    /// The map container moved or resized on the page
    ContainerMoved { rect: Bounds },
    /// The map instance was destroyed by the provider or the host
    MapLost,
}

/// Cloneable producer side of an [`EventQueue`]
pub type EventSender = Sender<MapEvent>;

/// Unbounded queue between provider callbacks and the map view
///
/// Provider callbacks only push; the map view drains on its own turn, so
/// no callback ever mutates view state directly.
pub struct EventQueue {
    tx: Sender<MapEvent>,
    rx: Receiver<MapEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    pub fn push(&self, event: MapEvent) {
        // The receiver lives as long as self
        let _ = self.tx.send(event);
    }

    /// Takes every pending event in arrival order
    pub fn drain(&self) -> Vec<MapEvent> {
        self.rx.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
