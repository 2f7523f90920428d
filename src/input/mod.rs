pub mod events;

// Re-export the essential types
pub use events::{DismissReason, EventHandled, EventQueue, EventSender, KeyCode, MapEvent};
